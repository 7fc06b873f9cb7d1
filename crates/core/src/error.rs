//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation, stock
/// rules). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. empty name, malformed price).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A stock decrease would drive quantity on hand below zero.
    #[error("insufficient stock: available {available}, requested delta {requested}")]
    InsufficientStock { available: i64, requested: i64 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn insufficient_stock(available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            available,
            requested,
        }
    }
}
