//! State store error types
//!
//! A failed transition leaves the state untouched.

use thiserror::Error;

use crate::model::EntityKind;

/// Error type for state store transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Malformed or out-of-range input
    #[error("invalid request: {0}")]
    Validation(String),

    /// A referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// No relay port left above the base port
    #[error("no free relay port on {host}")]
    PortsExhausted { host: String },
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
