//! Compare-and-swap updates over a [`RecordStore`].
//!
//! A read-modify-write is only safe if the write is conditioned on what was
//! read. [`update_with_retry`] reads the active record, derives the next
//! version from it and replaces it with `ExpectedRevision::Exact(observed)`.
//! Losing the race restarts the cycle from a fresh read.

use tracing::instrument;

use stockroom_core::{ExpectedRevision, Record};

use crate::error::{CatalogError, CatalogResult};
use crate::store::{RecordStore, StoreError};

/// Default number of read-modify-write attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Apply `mutate` to the current version of record `id` and store the result.
///
/// `mutate` sees the freshly read record on every attempt and may reject the
/// change; its error is returned as is and ends the loop. Only revision
/// conflicts are retried, at most `max_attempts` times in total (a value of 0
/// is treated as 1).
#[instrument(skip(store, mutate), fields(kind = R::KIND, id = %id), err)]
pub async fn update_with_retry<R, S, F>(
    store: &S,
    id: &R::Id,
    max_attempts: u32,
    mut mutate: F,
) -> CatalogResult<R>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
    F: FnMut(&R) -> CatalogResult<R> + Send,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let current = store.find_by_id(id).await?;
        let observed = current.revision();
        let next = mutate(&current)?;

        match store.replace(next, ExpectedRevision::Exact(observed)).await {
            Ok(stored) => return Ok(stored),
            Err(StoreError::Conflict { actual, .. }) => {
                tracing::debug!(attempt, observed, actual, "lost revision race, retrying");
            }
            Err(other) => return Err(other.into()),
        }
    }

    tracing::warn!(max_attempts, "revision conflicts exhausted the retry budget");
    Err(CatalogError::Conflict(format!(
        "{} {id} kept changing; gave up after {max_attempts} attempts",
        R::KIND
    )))
}
