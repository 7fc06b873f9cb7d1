//! Stock adjustment engine.

use tracing::instrument;

use stockroom_catalog::{Product, StockLevel, apply_delta};
use stockroom_core::ProductId;

use crate::cas::{self, DEFAULT_MAX_ATTEMPTS};
use crate::error::CatalogResult;
use crate::store::RecordStore;

/// Applies signed stock deltas without ever losing an update or driving
/// stock below zero.
///
/// Each adjustment is an optimistic read-modify-write: the new quantity is
/// written only if the product is still at the revision it was read at.
/// `InsufficientStock` is a business outcome and is never retried; lost races
/// are retried up to `max_attempts` reads before reporting `Conflict`.
///
/// Adjustments are not idempotent. Callers that must apply a change exactly
/// once deduplicate on their side. A write whose acknowledgement was lost
/// surfaces as `StoreUnavailable` and is never re-applied here.
#[derive(Debug, Clone)]
pub struct StockAdjuster<S> {
    store: S,
    max_attempts: u32,
}

impl<S> StockAdjuster<S>
where
    S: RecordStore<Product>,
{
    pub fn new(store: S) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(store: S, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Add `delta` to the stock of product `id`.
    ///
    /// A zero delta writes nothing and reports the current level.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn adjust(&self, id: ProductId, delta: i64) -> CatalogResult<StockLevel> {
        if delta == 0 {
            let current = self.store.find_by_id(&id).await?;
            return Ok(StockLevel {
                product_id: current.id,
                stock: current.stock,
                revision: current.meta.revision,
            });
        }

        let stored = cas::update_with_retry(&self.store, &id, self.max_attempts, |current| {
            let mut next: Product = current.clone();
            next.stock = apply_delta(current.stock, delta)?;
            Ok(next)
        })
        .await?;

        tracing::info!(stock = stored.stock, revision = stored.meta.revision, "stock adjusted");

        Ok(StockLevel {
            product_id: stored.id,
            stock: stored.stock,
            revision: stored.meta.revision,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use stockroom_catalog::{NewProduct, Price, ProductFilter};
    use stockroom_core::{Entity, ExpectedRevision, Page, PageRequest};

    use super::*;
    use crate::error::CatalogError;
    use crate::store::{InMemoryStore, RetryPolicy, RetryingStore, StoreError};

    async fn seeded(stock: i64) -> (Arc<InMemoryStore<Product>>, ProductId) {
        let store = Arc::new(InMemoryStore::new());
        let product = Product::draft(NewProduct {
            name: "Widget".to_string(),
            description: None,
            price: Price::from_minor(1999),
            stock,
            category_id: None,
        })
        .unwrap();
        let stored = store.insert(product).await.unwrap();
        (store, stored.id)
    }

    #[tokio::test]
    async fn restock_and_consume_scenario() {
        let (store, id) = seeded(10).await;
        let adjuster = StockAdjuster::new(store.clone());

        let level = adjuster.adjust(id, -3).await.unwrap();
        assert_eq!(level.stock, 7);
        assert_eq!(level.revision, 2);

        let err = adjuster.adjust(id, -10).await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::InsufficientStock {
                available: 7,
                requested: -10
            }
        );
        let unchanged = store.find_by_id(&id).await.unwrap();
        assert_eq!(unchanged.stock, 7);
        assert_eq!(unchanged.meta.revision, 2);

        let level = adjuster.adjust(id, 5).await.unwrap();
        assert_eq!(level.stock, 12);
        assert_eq!(level.revision, 3);
    }

    #[tokio::test]
    async fn zero_delta_reports_without_writing() {
        let (store, id) = seeded(4).await;
        let adjuster = StockAdjuster::new(store.clone());

        let level = adjuster.adjust(id, 0).await.unwrap();
        assert_eq!(level.product_id, id);
        assert_eq!(level.stock, 4);
        assert_eq!(level.revision, 1);
        assert_eq!(store.find_by_id(&id).await.unwrap().meta.revision, 1);

        assert_eq!(
            adjuster.adjust(ProductId::new(), 0).await.unwrap_err(),
            CatalogError::NotFound { kind: "product" }
        );
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let (store, _) = seeded(4).await;
        let adjuster = StockAdjuster::new(store);

        assert_eq!(
            adjuster.adjust(ProductId::new(), 1).await.unwrap_err(),
            CatalogError::NotFound { kind: "product" }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn last_unit_is_sold_once() {
        let (store, id) = seeded(1).await;
        let adjuster = Arc::new(StockAdjuster::new(store.clone()));

        let a = tokio::spawn({
            let adjuster = adjuster.clone();
            async move { adjuster.adjust(id, -1).await }
        });
        let b = tokio::spawn({
            let adjuster = adjuster.clone();
            async move { adjuster.adjust(id, -1).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        for result in &results {
            if let Err(err) = result {
                assert!(
                    matches!(
                        err,
                        CatalogError::InsufficientStock { .. } | CatalogError::Conflict(_)
                    ),
                    "unexpected error {err:?}"
                );
            }
        }
        assert_eq!(store.find_by_id(&id).await.unwrap().stock, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adjustments_never_lose_updates() {
        let (store, id) = seeded(50).await;
        // Generous budget so contention alone does not reject work.
        let adjuster = Arc::new(StockAdjuster::with_max_attempts(store.clone(), 1_000));

        let deltas: Vec<i64> = (0..64).map(|i| if i % 3 == 0 { 4 } else { -2 }).collect();
        let mut handles = Vec::new();
        for delta in deltas {
            let adjuster = adjuster.clone();
            handles.push(tokio::spawn(async move {
                (delta, adjuster.adjust(id, delta).await)
            }));
        }

        let mut applied = 0;
        for handle in handles {
            let (delta, result) = handle.await.unwrap();
            match result {
                Ok(level) => {
                    assert!(level.stock >= 0);
                    applied += delta;
                }
                Err(CatalogError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }

        let product = store.find_by_id(&id).await.unwrap();
        assert_eq!(product.stock, 50 + applied);
        assert!(product.stock >= 0);
    }

    /// Lets another writer bump the product between every read and write.
    /// With `lost_acks` armed, a committed replace is reported as a dropped
    /// connection instead.
    struct RacingStore {
        inner: InMemoryStore<Product>,
        races_left: AtomicU32,
        lost_acks: AtomicU32,
        reads: AtomicU32,
    }

    impl RacingStore {
        async fn seeded(stock: i64, races: u32) -> (Self, ProductId) {
            let inner = InMemoryStore::new();
            let stored = inner
                .insert(
                    Product::draft(NewProduct {
                        name: "Gadget".to_string(),
                        description: None,
                        price: Price::from_minor(500),
                        stock,
                        category_id: None,
                    })
                    .unwrap(),
                )
                .await
                .unwrap();
            let store = Self {
                inner,
                races_left: AtomicU32::new(races),
                lost_acks: AtomicU32::new(0),
                reads: AtomicU32::new(0),
            };
            (store, stored.id)
        }
    }

    #[async_trait::async_trait]
    impl RecordStore<Product> for RacingStore {
        async fn insert(&self, record: Product) -> Result<Product, StoreError> {
            self.inner.insert(record).await
        }

        async fn find_by_id(&self, id: &ProductId) -> Result<Product, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_id(id).await
        }

        async fn replace(
            &self,
            record: Product,
            expected: ExpectedRevision,
        ) -> Result<Product, StoreError> {
            let race = self
                .races_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if race {
                let current = self.inner.find_by_id(record.id()).await?;
                self.inner.replace(current, ExpectedRevision::Any).await?;
            }
            let stored = self.inner.replace(record, expected).await?;
            if self
                .lost_acks
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            Ok(stored)
        }

        async fn soft_delete(&self, id: &ProductId) -> Result<Product, StoreError> {
            self.inner.soft_delete(id).await
        }

        async fn list(
            &self,
            filter: &ProductFilter,
            page: PageRequest,
        ) -> Result<Page<Product>, StoreError> {
            self.inner.list(filter, page).await
        }

        async fn inspect(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
            self.inner.inspect(id).await
        }
    }

    #[tokio::test]
    async fn always_losing_the_race_ends_in_conflict() {
        let (store, id) = RacingStore::seeded(10, u32::MAX).await;
        let store = Arc::new(store);
        let adjuster = StockAdjuster::with_max_attempts(store.clone(), 3);

        let err = adjuster.adjust(id, -1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));
        assert_eq!(store.reads.load(Ordering::SeqCst), 3);
        assert_eq!(store.inner.find_by_id(&id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn a_lost_race_is_retried_from_a_fresh_read() {
        let (store, id) = RacingStore::seeded(10, 1).await;
        let store = Arc::new(store);
        let adjuster = StockAdjuster::new(store.clone());

        let level = adjuster.adjust(id, -4).await.unwrap();
        assert_eq!(level.stock, 6);
        // insert = 1, racing writer = 2, our write = 3
        assert_eq!(level.revision, 3);
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lost_acknowledgement_is_not_applied_twice() {
        let (store, id) = RacingStore::seeded(10, 0).await;
        store.lost_acks.store(1, Ordering::SeqCst);
        let store = Arc::new(store);
        let retrying = RetryingStore::new(
            store.clone(),
            RetryPolicy::exponential(3, Duration::from_millis(1), Duration::from_millis(1)),
        );
        let adjuster = StockAdjuster::new(retrying);

        let err = adjuster.adjust(id, -3).await.unwrap_err();
        assert!(matches!(err, CatalogError::StoreUnavailable(_)));

        let product = store.inner.find_by_id(&id).await.unwrap();
        assert_eq!(product.stock, 7);
        assert_eq!(product.meta.revision, 2);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }
}
