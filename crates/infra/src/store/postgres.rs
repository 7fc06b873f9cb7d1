//! Postgres-backed catalog store implementation.
//!
//! This module persists products and categories in PostgreSQL and enforces
//! the revision check of `replace` inside a single conditional `UPDATE`, so
//! the check and the write are one atomic statement.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `AlreadyExists` | Identifier or active category name collision |
//! | Database (check violation) | `23514` | `Integrity` | e.g. `stock >= 0` would be violated |
//! | Database (serialization failure / deadlock) | `40001` / `40P01` | `Unavailable` | Transient, safe to retry |
//! | Database (connection exception) | class `08` | `Unavailable` | Backend went away |
//! | Database (other) | Any other | `Integrity` | Other database errors |
//! | Io / Tls / PoolTimedOut / PoolClosed / WorkerCrashed | N/A | `Unavailable` | Network, pool exhaustion |
//! | Decode / ColumnDecode / other | N/A | `Integrity` | Row does not match the record model |
//!
//! ## Thread Safety
//!
//! `PostgresCatalogStore` is `Send + Sync` and can be shared across tasks.
//! All operations use the SQLx connection pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use stockroom_catalog::{Category, CategoryFilter, NameFilter, Price, Product, ProductFilter};
use stockroom_core::{
    CategoryId, Entity, ExpectedRevision, Identifier, Page, PageRequest, ProductId, Record,
    RecordMeta,
};

use super::r#trait::{RecordStore, StoreError};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const PRODUCT_COLUMNS: &str = "id, name, description, price_minor, stock, category_id, \
                               created_at, updated_at, deleted_at, revision";

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at, deleted_at, revision";

/// Postgres-backed store for both catalog record types.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    /// Create a new PostgresCatalogStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the catalog tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    /// Read-only transaction whose statements all see the same snapshot.
    async fn snapshot(
        &self,
        operation: &'static str,
    ) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(tx)
    }

    /// Revision and delete marker of a row, used to explain a failed
    /// conditional update.
    async fn write_state(
        &self,
        table: &'static str,
        id: &Uuid,
    ) -> Result<Option<(u64, bool)>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT revision, deleted_at IS NOT NULL AS deleted FROM {table} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("write_state", e))?;

        match row {
            Some(row) => {
                let revision = decode_revision(row.try_get("revision").map_err(decode_error)?)?;
                let deleted: bool = row.try_get("deleted").map_err(decode_error)?;
                Ok(Some((revision, deleted)))
            }
            None => Ok(None),
        }
    }

    /// Turn "conditional update touched no row" into `NotFound` or `Conflict`.
    async fn explain_missed_update<R: Record>(
        &self,
        table: &'static str,
        id: &Uuid,
        expected: ExpectedRevision,
    ) -> StoreError {
        match self.write_state(table, id).await {
            Ok(Some((actual, false))) => StoreError::Conflict { expected, actual },
            Ok(_) => StoreError::not_found::<R>(),
            Err(e) => e,
        }
    }
}

fn expected_param(expected: ExpectedRevision) -> Option<i64> {
    match expected {
        ExpectedRevision::Any => None,
        ExpectedRevision::Exact(r) => Some(r as i64),
    }
}

fn name_params(name: &Option<NameFilter>) -> (Option<&str>, Option<String>) {
    match name {
        Some(NameFilter::Equals(s)) => (Some(s.as_str()), None),
        Some(NameFilter::Contains(s)) => (None, Some(like_pattern(s))),
        None => (None, None),
    }
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn page_params(page: PageRequest) -> (i64, i64) {
    (
        i64::try_from(page.limit).unwrap_or(i64::MAX),
        i64::try_from(page.offset).unwrap_or(i64::MAX),
    )
}

#[async_trait::async_trait]
impl RecordStore<Product> for PostgresCatalogStore {
    #[instrument(skip_all, fields(kind = "product", id = tracing::field::Empty), err)]
    async fn insert(&self, mut record: Product) -> Result<Product, StoreError> {
        if record.id.is_nil() {
            record.id = ProductId::new();
        }
        let meta = RecordMeta::inserted(Utc::now());
        Span::current().record("id", tracing::field::display(record.id));

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (
                id, name, description, price_minor, stock, category_id,
                created_at, updated_at, deleted_at, revision
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, NULL, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(&record.description)
        .bind(price_param(record.price)?)
        .bind(record.stock)
        .bind(record.category_id.map(Uuid::from))
        .bind(meta.created_at)
        .bind(meta.revision as i64)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_insert_error("insert_product", record.id.as_uuid(), e))?;

        product_from_row(&row)
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(StoreError::not_found::<Product>()),
        }
    }

    #[instrument(skip_all, fields(kind = "product", id = %record.id, expected = ?expected), err)]
    async fn replace(
        &self,
        record: Product,
        expected: ExpectedRevision,
    ) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET name = $2,
                description = $3,
                price_minor = $4,
                stock = $5,
                category_id = $6,
                updated_at = $7,
                revision = revision + 1
            WHERE id = $1
                AND deleted_at IS NULL
                AND ($8::bigint IS NULL OR revision = $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(&record.description)
        .bind(price_param(record.price)?)
        .bind(record.stock)
        .bind(record.category_id.map(Uuid::from))
        .bind(Utc::now())
        .bind(expected_param(expected))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace_product", e))?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(self
                .explain_missed_update::<Product>("products", record.id.as_uuid(), expected)
                .await),
        }
    }

    #[instrument(skip_all, fields(kind = "product", id = %id), err)]
    async fn soft_delete(&self, id: &ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET deleted_at = $2, updated_at = $2, revision = revision + 1
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_product", e))?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(StoreError::not_found::<Product>()),
        }
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        let category = filter.category.map(Uuid::from);
        let (name_eq, name_like) = name_params(&filter.name);
        let (limit, offset) = page_params(page);

        const WHERE: &str = r#"
            WHERE deleted_at IS NULL
                AND ($1::uuid IS NULL OR category_id = $1)
                AND ($2::text IS NULL OR name = $2)
                AND ($3::text IS NULL OR name ILIKE $3)
        "#;

        // Count and page read one snapshot so `total` agrees with `items`.
        let mut tx = self.snapshot("list_products").await?;

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS total FROM products {WHERE}"))
            .bind(category)
            .bind(name_eq)
            .bind(name_like.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?
            .try_get("total")
            .map_err(decode_error)?;

        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products {WHERE} ORDER BY id ASC LIMIT $4 OFFSET $5"
        ))
        .bind(category)
        .bind(name_eq)
        .bind(name_like.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let items = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn inspect(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("inspect_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }
}

#[async_trait::async_trait]
impl RecordStore<Category> for PostgresCatalogStore {
    #[instrument(skip_all, fields(kind = "category", id = tracing::field::Empty), err)]
    async fn insert(&self, mut record: Category) -> Result<Category, StoreError> {
        if record.id.is_nil() {
            record.id = CategoryId::new();
        }
        let meta = RecordMeta::inserted(Utc::now());
        Span::current().record("id", tracing::field::display(record.id));

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at, deleted_at, revision)
            VALUES ($1, $2, $3, $4, $4, NULL, $5)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(&record.description)
        .bind(meta.created_at)
        .bind(meta.revision as i64)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_insert_error("insert_category", record.id.as_uuid(), e))?;

        category_from_row(&row)
    }

    async fn find_by_id(&self, id: &CategoryId) -> Result<Category, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_category", e))?;

        match row {
            Some(row) => category_from_row(&row),
            None => Err(StoreError::not_found::<Category>()),
        }
    }

    #[instrument(skip_all, fields(kind = "category", id = %record.id(), expected = ?expected), err)]
    async fn replace(
        &self,
        record: Category,
        expected: ExpectedRevision,
    ) -> Result<Category, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE categories
            SET name = $2, description = $3, updated_at = $4, revision = revision + 1
            WHERE id = $1
                AND deleted_at IS NULL
                AND ($5::bigint IS NULL OR revision = $5)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(&record.description)
        .bind(Utc::now())
        .bind(expected_param(expected))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace_category", e))?;

        match row {
            Some(row) => category_from_row(&row),
            None => Err(self
                .explain_missed_update::<Category>("categories", record.id.as_uuid(), expected)
                .await),
        }
    }

    #[instrument(skip_all, fields(kind = "category", id = %id), err)]
    async fn soft_delete(&self, id: &CategoryId) -> Result<Category, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE categories
            SET deleted_at = $2, updated_at = $2, revision = revision + 1
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_category", e))?;

        match row {
            Some(row) => category_from_row(&row),
            None => Err(StoreError::not_found::<Category>()),
        }
    }

    async fn list(
        &self,
        filter: &CategoryFilter,
        page: PageRequest,
    ) -> Result<Page<Category>, StoreError> {
        let (name_eq, name_like) = name_params(&filter.name);
        let (limit, offset) = page_params(page);

        const WHERE: &str = r#"
            WHERE deleted_at IS NULL
                AND ($1::text IS NULL OR name = $1)
                AND ($2::text IS NULL OR name ILIKE $2)
        "#;

        let mut tx = self.snapshot("list_categories").await?;

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS total FROM categories {WHERE}"))
            .bind(name_eq)
            .bind(name_like.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("count_categories", e))?
            .try_get("total")
            .map_err(decode_error)?;

        let rows = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories {WHERE} ORDER BY id ASC LIMIT $3 OFFSET $4"
        ))
        .bind(name_eq)
        .bind(name_like.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;

        let items = rows
            .iter()
            .map(category_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn inspect(&self, id: &CategoryId) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("inspect_category", e))?;

        row.as_ref().map(category_from_row).transpose()
    }
}

// Row mapping

fn price_param(price: Price) -> Result<i64, StoreError> {
    i64::try_from(price.minor())
        .map_err(|_| StoreError::Integrity(format!("price {price} exceeds storage range")))
}

fn decode_revision(raw: i64) -> Result<u64, StoreError> {
    u64::try_from(raw).map_err(|_| StoreError::Integrity(format!("negative revision {raw}")))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Integrity(format!("failed to decode row: {err}"))
}

fn meta_from_row(row: &PgRow) -> Result<RecordMeta, StoreError> {
    Ok(RecordMeta {
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode_error)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(decode_error)?,
        deleted_at: row
            .try_get::<Option<DateTime<Utc>>, _>("deleted_at")
            .map_err(decode_error)?,
        revision: decode_revision(row.try_get("revision").map_err(decode_error)?)?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let price_minor: i64 = row.try_get("price_minor").map_err(decode_error)?;
    let price = u64::try_from(price_minor)
        .map(Price::from_minor)
        .map_err(|_| StoreError::Integrity(format!("negative price {price_minor}")))?;

    let stock: i64 = row.try_get("stock").map_err(decode_error)?;
    if stock < 0 {
        return Err(StoreError::Integrity(format!("negative stock {stock}")));
    }

    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        price,
        stock,
        category_id: row
            .try_get::<Option<Uuid>, _>("category_id")
            .map_err(decode_error)?
            .and_then(CategoryId::from_reference),
        meta: meta_from_row(row)?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, StoreError> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        meta: meta_from_row(row)?,
    })
}

/// Whether a database error is a primary key collision.
fn is_identifier_collision(code: Option<&str>, constraint: Option<&str>) -> bool {
    code == Some("23505") && constraint.is_some_and(|c| c.ends_with("_pkey"))
}

/// Map an INSERT failure; identifier collisions are logged before mapping.
fn map_insert_error(operation: &str, id: &Uuid, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if is_identifier_collision(db_err.code().as_deref(), db_err.constraint()) {
            tracing::error!(%id, operation, "identifier collision on insert");
        }
    }
    map_sqlx_error(operation, err)
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => StoreError::AlreadyExists(msg),
                // Serialization failure / deadlock: the statement can simply be retried
                Some("40001") | Some("40P01") => StoreError::Unavailable(msg),
                // Connection exception class
                Some(code) if code.starts_with("08") => StoreError::Unavailable(msg),
                _ => StoreError::Integrity(msg),
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            StoreError::Unavailable(format!("{} in {}", err, operation))
        }
        _ => StoreError::Integrity(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("ham"), "%ham%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn expected_revision_becomes_nullable_parameter() {
        assert_eq!(expected_param(ExpectedRevision::Any), None);
        assert_eq!(expected_param(ExpectedRevision::Exact(7)), Some(7));
    }

    #[test]
    fn only_primary_key_violations_are_identifier_collisions() {
        assert!(is_identifier_collision(Some("23505"), Some("products_pkey")));
        assert!(is_identifier_collision(Some("23505"), Some("categories_pkey")));
        assert!(!is_identifier_collision(
            Some("23505"),
            Some("categories_active_name_key")
        ));
        assert!(!is_identifier_collision(Some("23514"), Some("products_pkey")));
        assert!(!is_identifier_collision(Some("23505"), None));
    }

    #[test]
    fn pool_failures_are_transient() {
        assert!(map_sqlx_error("op", sqlx::Error::PoolTimedOut).is_transient());
        assert!(!map_sqlx_error("op", sqlx::Error::RowNotFound).is_transient());
    }

    /// Needs a disposable database in `TEST_DATABASE_URL`.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn listing_total_matches_items_under_concurrent_inserts() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let store = PostgresCatalogStore::new(PgPool::connect(&url).await.unwrap());
        store.ensure_schema().await.unwrap();

        // A fresh category scopes the listing to this test's rows.
        let category = Some(CategoryId::new());

        let writer = tokio::spawn({
            let store = store.clone();
            async move {
                for n in 0..50 {
                    let draft = Product::draft(stockroom_catalog::NewProduct {
                        name: format!("Item {n}"),
                        description: None,
                        price: Price::from_minor(100),
                        stock: 1,
                        category_id: category,
                    })
                    .unwrap();
                    RecordStore::<Product>::insert(&store, draft).await.unwrap();
                }
            }
        });

        let filter = ProductFilter {
            name: None,
            category,
        };
        while !writer.is_finished() {
            let page = RecordStore::<Product>::list(&store, &filter, PageRequest::new(0, 1_000))
                .await
                .unwrap();
            assert_eq!(page.total, page.items.len() as u64);
        }
        writer.await.unwrap();

        let page = RecordStore::<Product>::list(&store, &filter, PageRequest::new(0, 1_000))
            .await
            .unwrap();
        assert_eq!(page.total, 50);
    }
}
