//!
//! Errors returned by every engine operation.
//!

use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RideError {
    /// A referenced user, ride or participation does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The state machine refuses the operation
    #[error("business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// Missing or malformed request fields
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store could not load, convert or persist, the operation did not happen
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl RideError {
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        RideError::NotFound(what.into())
    }

    pub fn rule<S: Into<String>>(reason: S) -> Self {
        RideError::BusinessRuleViolation(reason.into())
    }

    pub fn invalid<S: Into<String>>(reason: S) -> Self {
        RideError::InvalidInput(reason.into())
    }
}
