use std::sync::Arc;

use thiserror::Error;

use stockroom_core::{ExpectedRevision, Page, PageRequest, Record};

/// Catalog store operation error.
///
/// These are **storage outcomes** (missing rows, revision conflicts,
/// connectivity) as opposed to domain errors (validation, stock rules).
///
/// ## Error Categories
///
/// - **NotFound**: identifier absent or soft-deleted
/// - **AlreadyExists**: identifier or unique key collision on write
/// - **Conflict**: revision-checked write lost against another writer
/// - **Unavailable**: transient connectivity/IO failure (retryable)
/// - **Integrity**: stored data violates an invariant (row decode failure,
///   check constraint)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} not found")]
    NotFound { kind: &'static str },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("revision conflict: expected {expected:?}, found {actual}")]
    Conflict {
        expected: ExpectedRevision,
        actual: u64,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("integrity violation: {0}")]
    Integrity(String),
}

impl StoreError {
    pub fn not_found<R: Record>() -> Self {
        StoreError::NotFound { kind: R::KIND }
    }

    /// Only transient failures are worth retrying at the IO boundary.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Keyed, soft-deleting, revision-checked storage for one record type.
///
/// ## Write Semantics
///
/// Every mutating call touches exactly one record and stamps its
/// [`RecordMeta`](stockroom_core::RecordMeta): `insert` sets revision 1,
/// `replace` and `soft_delete` increment the stored revision in the same
/// atomic write. No call cascades to other records.
///
/// ## Read Semantics
///
/// `find_by_id` and `list` only see active records. `list` orders by
/// identifier so repeated enumerations over unchanged data page identically.
/// `inspect` is the store-level view that also returns soft-deleted records.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - perform the revision check and the write of `replace` atomically
/// - never hold an in-process lock across an `.await`
/// - keep `created_at` and the delete marker under store control on replace
#[async_trait::async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Persist a new record. A nil identifier is replaced by a fresh one.
    async fn insert(&self, record: R) -> Result<R, StoreError>;

    /// Load the active record for `id`.
    async fn find_by_id(&self, id: &R::Id) -> Result<R, StoreError>;

    /// Overwrite the active record keyed by `record.id()`.
    async fn replace(&self, record: R, expected: ExpectedRevision) -> Result<R, StoreError>;

    /// Set the delete marker on the active record for `id`.
    async fn soft_delete(&self, id: &R::Id) -> Result<R, StoreError>;

    /// Enumerate active records matching `filter`, ordered by identifier.
    async fn list(&self, filter: &R::Filter, page: PageRequest) -> Result<Page<R>, StoreError>;

    /// Load the record for `id` regardless of its delete marker.
    async fn inspect(&self, id: &R::Id) -> Result<Option<R>, StoreError>;
}

#[async_trait::async_trait]
impl<R, S> RecordStore<R> for Arc<S>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
{
    async fn insert(&self, record: R) -> Result<R, StoreError> {
        (**self).insert(record).await
    }

    async fn find_by_id(&self, id: &R::Id) -> Result<R, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn replace(&self, record: R, expected: ExpectedRevision) -> Result<R, StoreError> {
        (**self).replace(record, expected).await
    }

    async fn soft_delete(&self, id: &R::Id) -> Result<R, StoreError> {
        (**self).soft_delete(id).await
    }

    async fn list(&self, filter: &R::Filter, page: PageRequest) -> Result<Page<R>, StoreError> {
        (**self).list(filter, page).await
    }

    async fn inspect(&self, id: &R::Id) -> Result<Option<R>, StoreError> {
        (**self).inspect(id).await
    }
}
