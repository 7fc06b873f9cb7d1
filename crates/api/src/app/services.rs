//! Store selection and catalog service wiring.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use stockroom_catalog::{Category, Product};
use stockroom_infra::store::{InMemoryStore, PostgresCatalogStore, RecordStore, RetryingStore};
use stockroom_infra::{CatalogService, StockroomConfig};

pub type ProductStore = Arc<dyn RecordStore<Product>>;
pub type CategoryStore = Arc<dyn RecordStore<Category>>;

/// The catalog facade as seen by the HTTP handlers.
pub type AppServices = CatalogService<ProductStore, CategoryStore>;

/// Connect to Postgres when `DATABASE_URL` is set, otherwise run in memory.
pub async fn build_services(config: &StockroomConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => build_persistent_services(config, url).await,
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores (data is lost on exit)");
            Ok(build_in_memory_services(config))
        }
    }
}

pub fn build_in_memory_services(config: &StockroomConfig) -> AppServices {
    let products: ProductStore = Arc::new(InMemoryStore::<Product>::new());
    let categories: CategoryStore = Arc::new(InMemoryStore::<Category>::new());
    CatalogService::new(
        products,
        categories,
        config.stock_max_attempts,
        config.page_limits,
    )
}

async fn build_persistent_services(
    config: &StockroomConfig,
    database_url: &str,
) -> anyhow::Result<AppServices> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    let pg = PostgresCatalogStore::new(pool);
    pg.ensure_schema()
        .await
        .context("failed to apply catalog schema")?;
    tracing::info!("connected to Postgres; catalog schema ready");

    let store = Arc::new(RetryingStore::new(pg, config.store_retry.clone()));
    let products: ProductStore = store.clone();
    let categories: CategoryStore = store;

    Ok(CatalogService::new(
        products,
        categories,
        config.stock_max_attempts,
        config.page_limits,
    ))
}
