//!
//! Documentation of the config module.
//! Holds the 'confy' configuration and the 'fern' logger.
//!

pub mod config;
