use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::instrument;

use stockroom_core::{Entity, ExpectedRevision, Identifier, Page, PageRequest, Record, RecordMeta};

use super::r#trait::{RecordStore, StoreError};

/// In-memory catalog store.
///
/// Intended for tests/dev. Records are kept in identifier order, and every
/// check-and-write happens under a single write-lock acquisition, so a
/// revision-checked `replace` is atomic with respect to other writers.
#[derive(Debug)]
pub struct InMemoryStore<R: Record> {
    records: RwLock<BTreeMap<R::Id, R>>,
}

impl<R: Record> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Integrity("lock poisoned".to_string())
    }

    /// Reject `candidate` if another active record already holds its unique key.
    fn ensure_unique(records: &BTreeMap<R::Id, R>, candidate: &R) -> Result<(), StoreError> {
        let Some(key) = candidate.unique_key() else {
            return Ok(());
        };
        let taken = records.values().any(|r| {
            r.id() != candidate.id() && r.is_active() && r.unique_key().as_deref() == Some(&key)
        });
        if taken {
            return Err(StoreError::AlreadyExists(format!("{} '{key}'", R::KIND)));
        }
        Ok(())
    }
}

impl<R: Record> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<R: Record> RecordStore<R> for InMemoryStore<R> {
    #[instrument(skip_all, fields(kind = R::KIND), err)]
    async fn insert(&self, mut record: R) -> Result<R, StoreError> {
        if record.id().is_nil() {
            record.set_id(R::Id::fresh());
        }
        *record.meta_mut() = RecordMeta::inserted(Utc::now());

        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        if records.contains_key(record.id()) {
            tracing::error!(id = %record.id(), "identifier collision on insert");
            return Err(StoreError::AlreadyExists(format!("{} {}", R::KIND, record.id())));
        }
        Self::ensure_unique(&records, &record)?;

        records.insert(*record.id(), record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &R::Id) -> Result<R, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        records
            .get(id)
            .filter(|r| r.is_active())
            .cloned()
            .ok_or_else(StoreError::not_found::<R>)
    }

    #[instrument(skip_all, fields(kind = R::KIND, id = %record.id(), expected = ?expected), err)]
    async fn replace(&self, mut record: R, expected: ExpectedRevision) -> Result<R, StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;

        let stored = records
            .get(record.id())
            .filter(|r| r.is_active())
            .ok_or_else(StoreError::not_found::<R>)?;

        let actual = stored.revision();
        if !expected.matches(actual) {
            return Err(StoreError::Conflict { expected, actual });
        }
        Self::ensure_unique(&records, &record)?;

        *record.meta_mut() = RecordMeta::replaced(stored.meta(), Utc::now());
        records.insert(*record.id(), record.clone());
        Ok(record)
    }

    #[instrument(skip_all, fields(kind = R::KIND, id = %id), err)]
    async fn soft_delete(&self, id: &R::Id) -> Result<R, StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;

        let record = records
            .get_mut(id)
            .filter(|r| r.is_active())
            .ok_or_else(StoreError::not_found::<R>)?;

        let meta = RecordMeta::deleted(record.meta(), Utc::now());
        *record.meta_mut() = meta;
        Ok(record.clone())
    }

    async fn list(&self, filter: &R::Filter, page: PageRequest) -> Result<Page<R>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;

        // BTreeMap iteration is identifier-ordered, which keeps pages stable.
        let matching = records
            .values()
            .filter(|r| r.is_active() && r.matches(filter))
            .cloned();

        Ok(Page::from_ordered(matching, page))
    }

    async fn inspect(&self, id: &R::Id) -> Result<Option<R>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.get(id).cloned())
    }
}
