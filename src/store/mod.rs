//!
//! Documentation of the store module.
//! Contains the entity store and the models it keeps for a RidePool process.
//!

pub mod models;
pub mod store;
pub mod store_utils;

pub use store::{EntityStore, Record, StoreError};
