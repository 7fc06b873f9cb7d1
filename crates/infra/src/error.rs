use thiserror::Error;

use stockroom_core::DomainError;

use crate::store::StoreError;

/// Boundary error of the catalog service.
///
/// Every operation of [`CatalogService`](crate::service::CatalogService)
/// reports one of these; the HTTP adapter maps each variant to a status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("{kind} not found")]
    NotFound { kind: &'static str },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("integrity violation: {0}")]
    Integrity(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind } => Self::NotFound { kind },
            StoreError::AlreadyExists(msg) => Self::AlreadyExists(msg),
            StoreError::Conflict { expected, actual } => Self::Conflict(format!(
                "revision check failed (expected: {expected:?}, actual: {actual})"
            )),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Integrity(msg) => Self::Integrity(msg),
        }
    }
}

impl From<DomainError> for CatalogError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::InsufficientStock {
                available,
                requested,
            } => Self::InsufficientStock {
                available,
                requested,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use stockroom_core::ExpectedRevision;

    use super::*;

    #[test]
    fn store_outcomes_keep_their_meaning() {
        assert_eq!(
            CatalogError::from(StoreError::NotFound { kind: "product" }),
            CatalogError::NotFound { kind: "product" }
        );
        assert!(matches!(
            CatalogError::from(StoreError::Conflict {
                expected: ExpectedRevision::Exact(1),
                actual: 2
            }),
            CatalogError::Conflict(_)
        ));
        assert!(matches!(
            CatalogError::from(StoreError::Unavailable("timeout".into())),
            CatalogError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn insufficient_stock_carries_amounts() {
        let err = CatalogError::from(DomainError::insufficient_stock(7, -10));
        assert_eq!(
            err,
            CatalogError::InsufficientStock {
                available: 7,
                requested: -10
            }
        );
        assert_eq!(
            err.to_string(),
            "insufficient stock: available 7, requested -10"
        );
    }
}
