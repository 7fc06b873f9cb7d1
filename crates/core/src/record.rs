//! Stored record model: bookkeeping every persisted record carries.
//!
//! Stores own the [`RecordMeta`] of a record: callers build drafts with
//! [`RecordMeta::unsaved`] and the store stamps timestamps, the delete marker
//! and the revision counter as part of each write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Timestamps, soft-delete marker and revision counter of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` while the record is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Incremented on every successful write; `0` means "never stored".
    pub revision: u64,
}

impl RecordMeta {
    /// Placeholder metadata for a record that has not been inserted yet.
    pub fn unsaved() -> Self {
        Self {
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            deleted_at: None,
            revision: 0,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Metadata of a freshly inserted record.
    pub fn inserted(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
            revision: 1,
        }
    }

    /// Metadata written by a full replace of `stored`.
    ///
    /// Creation time and delete marker always come from the stored copy.
    pub fn replaced(stored: &RecordMeta, now: DateTime<Utc>) -> Self {
        Self {
            created_at: stored.created_at,
            updated_at: now,
            deleted_at: stored.deleted_at,
            revision: stored.revision + 1,
        }
    }

    /// Metadata written by a soft delete of `stored`.
    pub fn deleted(stored: &RecordMeta, now: DateTime<Utc>) -> Self {
        Self {
            created_at: stored.created_at,
            updated_at: now,
            deleted_at: Some(now),
            revision: stored.revision + 1,
        }
    }
}

impl Default for RecordMeta {
    fn default() -> Self {
        Self::unsaved()
    }
}

/// A persisted catalog record (product, category).
pub trait Record: Entity + Clone + Send + Sync + 'static {
    /// Typed filter accepted by store enumeration.
    type Filter: Send + Sync;

    /// Human-readable record kind used in logs and error messages.
    const KIND: &'static str;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    fn set_id(&mut self, id: Self::Id);

    /// Whether the record satisfies every term of `filter`.
    fn matches(&self, filter: &Self::Filter) -> bool;

    /// Key that must be unique among active records, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }

    fn revision(&self) -> u64 {
        self.meta().revision
    }

    fn is_active(&self) -> bool {
        !self.meta().is_deleted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn replace_keeps_creation_time_and_bumps_revision() {
        let t0 = Utc::now();
        let stored = RecordMeta::inserted(t0);
        let t1 = t0 + Duration::seconds(5);

        let next = RecordMeta::replaced(&stored, t1);
        assert_eq!(next.created_at, t0);
        assert_eq!(next.updated_at, t1);
        assert_eq!(next.revision, 2);
        assert!(!next.is_deleted());
    }

    #[test]
    fn delete_sets_marker_and_bumps_revision() {
        let t0 = Utc::now();
        let stored = RecordMeta::inserted(t0);
        let deleted = RecordMeta::deleted(&stored, t0);
        assert!(deleted.is_deleted());
        assert_eq!(deleted.revision, 2);
    }
}
