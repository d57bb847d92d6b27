//!
//! Documentation of the engine module.
//! The ride lifecycle: who may join, who gets a seat, and how rides move
//! from `ready` to `completed`.
//!
//! ```text
//! Ride:           ready ──▶ inprogress ──▶ completed
//!
//! Participation:  waiting ──▶ confirmed ──▶ inprogress ──▶ completed
//!                    │            │             │
//!                    ▼            ▼             ▼
//!                 rejected     missing      notmarked
//! ```
//!

pub mod engine;
pub mod errors;
pub mod lifecycle;
pub mod stats;

pub use engine::RideEngine;
pub use errors::RideError;

#[cfg(test)] mod tests;
