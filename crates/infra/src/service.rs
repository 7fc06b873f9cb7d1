//! Catalog facade: the operations exposed to callers (HTTP adapter, tests).
//!
//! Writes go through the stores and the compare-and-swap helper, reads go
//! through [`CatalogQueryService`]. The facade owns no state of its own.

use tracing::instrument;

use stockroom_catalog::{
    Category, CategoryUpdate, NewCategory, NewProduct, Product, ProductUpdate, StockLevel,
};
use stockroom_core::{CategoryId, ExpectedRevision, Page, ProductId};

use crate::cas;
use crate::error::{CatalogError, CatalogResult};
use crate::query::{CatalogQueryService, PageLimits, ProductQuery, ProductView};
use crate::stock::StockAdjuster;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone)]
pub struct CatalogService<P, C> {
    products: P,
    categories: C,
    stock: StockAdjuster<P>,
    queries: CatalogQueryService<P, C>,
    max_attempts: u32,
}

impl<P, C> CatalogService<P, C>
where
    P: RecordStore<Product> + Clone,
    C: RecordStore<Category> + Clone,
{
    pub fn new(products: P, categories: C, max_attempts: u32, limits: PageLimits) -> Self {
        Self {
            stock: StockAdjuster::with_max_attempts(products.clone(), max_attempts),
            queries: CatalogQueryService::new(products.clone(), categories.clone(), limits),
            products,
            categories,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn queries(&self) -> &CatalogQueryService<P, C> {
        &self.queries
    }

    // Products

    #[instrument(skip_all, err)]
    pub async fn create_product(&self, params: NewProduct) -> CatalogResult<Product> {
        let draft = Product::draft(params)?;
        if let Some(category_id) = draft.category_id {
            self.ensure_category_exists(category_id).await?;
        }
        let product = self.products.insert(draft).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> CatalogResult<Product> {
        Ok(self.products.find_by_id(&id).await?)
    }

    /// Merge `update` onto the current product and store it, retrying the
    /// merge if the product changed concurrently.
    #[instrument(skip(self, update), fields(product_id = %id), err)]
    pub async fn update_product(&self, id: ProductId, update: ProductUpdate) -> CatalogResult<Product> {
        if let Some(category_id) = update.new_category() {
            self.ensure_category_exists(category_id).await?;
        }
        cas::update_with_retry(&self.products, &id, self.max_attempts, |current: &Product| {
            Ok(update.apply(current)?)
        })
        .await
    }

    /// Full replace conditioned on the revision carried by `product`.
    ///
    /// Revision 0 (an unsaved record) skips the check.
    #[instrument(skip_all, fields(product_id = %product.id), err)]
    pub async fn replace_product(&self, product: Product) -> CatalogResult<Product> {
        product.validate()?;
        if let Some(category_id) = product.category_id {
            self.ensure_category_exists(category_id).await?;
        }
        let expected = match product.meta.revision {
            0 => ExpectedRevision::Any,
            n => ExpectedRevision::Exact(n),
        };
        Ok(self.products.replace(product, expected).await?)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        self.products.soft_delete(&id).await?;
        tracing::info!("product deleted");
        Ok(())
    }

    pub async fn list_products(&self, query: ProductQuery) -> CatalogResult<Page<ProductView>> {
        self.queries.list_products(query).await
    }

    pub async fn adjust_stock(&self, id: ProductId, delta: i64) -> CatalogResult<StockLevel> {
        self.stock.adjust(id, delta).await
    }

    // Categories

    #[instrument(skip_all, err)]
    pub async fn create_category(&self, params: NewCategory) -> CatalogResult<Category> {
        let draft = Category::draft(params)?;
        let category = self.categories.insert(draft).await?;
        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub async fn get_category(&self, id: CategoryId) -> CatalogResult<Category> {
        Ok(self.categories.find_by_id(&id).await?)
    }

    #[instrument(skip(self, update), fields(category_id = %id), err)]
    pub async fn update_category(
        &self,
        id: CategoryId,
        update: CategoryUpdate,
    ) -> CatalogResult<Category> {
        cas::update_with_retry(&self.categories, &id, self.max_attempts, |current: &Category| {
            Ok(update.apply(current)?)
        })
        .await
    }

    /// Soft-delete a category. Products keep their (now dangling) reference.
    #[instrument(skip(self), fields(category_id = %id), err)]
    pub async fn delete_category(&self, id: CategoryId) -> CatalogResult<()> {
        self.categories.soft_delete(&id).await?;
        tracing::info!("category deleted");
        Ok(())
    }

    pub async fn list_categories(&self, page: u64, page_size: u64) -> CatalogResult<Page<Category>> {
        self.queries.list_categories(page, page_size).await
    }

    async fn ensure_category_exists(&self, id: CategoryId) -> CatalogResult<()> {
        match self.categories.find_by_id(&id).await {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(CatalogError::validation(format!(
                "unknown category {id}"
            ))),
            Err(other) => Err(other.into()),
        }
    }
}
