//! Retry of transient store failures.
//!
//! [`RetryingStore`] wraps any [`RecordStore`] and re-issues calls that fail
//! with [`StoreError::Unavailable`]. Every other outcome (including revision
//! conflicts) is returned to the caller untouched; conflicts belong to the
//! stock engine, not to the IO boundary.
//!
//! A write that failed transiently may still have committed. When the
//! re-issued write then trips over its own effect, the decorator resolves the
//! outcome instead of reporting a false failure: inserts and soft deletes
//! are confirmed with `inspect`, while a conditional replace cannot be told
//! apart from a concurrent writer and is reported as `Unavailable`.

use std::future::Future;
use std::time::Duration;

use stockroom_core::{Entity, ExpectedRevision, Identifier, Page, PageRequest, Record};

use super::r#trait::{RecordStore, StoreError};

/// Exponential backoff policy for transient store failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first call (0 = no retries)
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every further retry
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Jitter factor (0.0-1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(50), Duration::from_secs(1))
    }
}

/// Result of a call run under a [`RetryPolicy`].
#[derive(Debug)]
pub struct Attempts<T> {
    pub result: Result<T, StoreError>,
    /// Calls re-issued after a transient failure.
    pub retries: u32,
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            jitter: 0.1,
        }
    }

    /// Delay before retry number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let exp = 2_f64.powi(attempt.saturating_sub(1).min(30) as i32);
        let delay_ms = (base_ms * exp).min(max_ms);

        // Deterministic spread keyed on the attempt number
        let jitter_range = delay_ms * self.jitter;
        let jitter = if jitter_range > 0.0 {
            let spread = ((attempt as f64 * 17.0) % 100.0) / 100.0;
            jitter_range * (spread - 0.5) * 2.0
        } else {
            0.0
        };

        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Attempts<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut retries = 0;
        loop {
            match op().await {
                Err(err) if err.is_transient() && self.should_retry(retries) => {
                    retries += 1;
                    let delay = self.delay_for_attempt(retries);
                    tracing::warn!(
                        operation,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "store unavailable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return Attempts { result, retries },
            }
        }
    }
}

/// A store decorator that retries transient failures with backoff.
#[derive(Debug, Clone)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<R, S> RecordStore<R> for RetryingStore<S>
where
    R: Record,
    R::Filter: Sync,
    S: RecordStore<R>,
{
    async fn insert(&self, mut record: R) -> Result<R, StoreError> {
        // Pin the identifier so a retried insert cannot create a second record.
        if record.id().is_nil() {
            record.set_id(R::Id::fresh());
        }
        let attempts = self
            .policy
            .run("insert", || self.inner.insert(record.clone()))
            .await;
        match attempts.result {
            Err(StoreError::AlreadyExists(msg)) if attempts.retries > 0 => {
                match self.inner.inspect(record.id()).await? {
                    Some(stored) => {
                        tracing::info!(id = %record.id(), "retried insert had already committed");
                        Ok(stored)
                    }
                    None => Err(StoreError::AlreadyExists(msg)),
                }
            }
            result => result,
        }
    }

    async fn find_by_id(&self, id: &R::Id) -> Result<R, StoreError> {
        self.policy
            .run("find_by_id", || self.inner.find_by_id(id))
            .await
            .result
    }

    async fn replace(&self, record: R, expected: ExpectedRevision) -> Result<R, StoreError> {
        let attempts = self
            .policy
            .run("replace", || self.inner.replace(record.clone(), expected))
            .await;
        match attempts.result {
            // The earlier attempt may be the writer that moved the revision.
            // Re-reading cannot prove it either way, so the outcome stays
            // unknown rather than inviting the caller to apply it again.
            Err(StoreError::Conflict { actual, .. })
                if attempts.retries > 0 && matches!(expected, ExpectedRevision::Exact(_)) =>
            {
                tracing::warn!(
                    id = %record.id(),
                    expected = ?expected,
                    actual,
                    "retried replace hit a revision conflict; outcome unknown"
                );
                Err(StoreError::Unavailable(format!(
                    "outcome of retried replace of {} {} is unknown",
                    R::KIND,
                    record.id()
                )))
            }
            result => result,
        }
    }

    async fn soft_delete(&self, id: &R::Id) -> Result<R, StoreError> {
        let attempts = self
            .policy
            .run("soft_delete", || self.inner.soft_delete(id))
            .await;
        match attempts.result {
            Err(StoreError::NotFound { kind }) if attempts.retries > 0 => {
                match self.inner.inspect(id).await? {
                    Some(stored) if !stored.is_active() => {
                        tracing::info!(id = %id, "retried soft delete had already committed");
                        Ok(stored)
                    }
                    _ => Err(StoreError::NotFound { kind }),
                }
            }
            result => result,
        }
    }

    async fn list(&self, filter: &R::Filter, page: PageRequest) -> Result<Page<R>, StoreError> {
        self.policy
            .run("list", || self.inner.list(filter, page))
            .await
            .result
    }

    async fn inspect(&self, id: &R::Id) -> Result<Option<R>, StoreError> {
        self.policy
            .run("inspect", || self.inner.inspect(id))
            .await
            .result
    }
}
