//! Read side of the catalog: paged product and category listings.

use std::collections::HashMap;

use serde::Serialize;
use tracing::instrument;

use stockroom_catalog::{Category, CategoryFilter, NameFilter, Product, ProductFilter};
use stockroom_core::{CategoryId, Page, PageRequest};

use crate::error::CatalogResult;
use crate::store::{RecordStore, StoreError};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Page size bounds applied to every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    /// Window for a 1-based page number.
    ///
    /// `page` is clamped to at least 1. A `page_size` of 0 means "use the
    /// default"; any size is clamped to `[1, max_page_size]`.
    pub fn request(&self, page: u64, page_size: u64) -> PageRequest {
        let size = if page_size == 0 {
            self.default_page_size
        } else {
            page_size
        };
        let size = size.clamp(1, self.max_page_size.max(1));
        PageRequest::for_page(page, size)
    }
}

/// Product listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub name: Option<NameFilter>,
    pub category: Option<CategoryId>,
    /// 1-based; 0 is treated as 1.
    pub page: u64,
    /// 0 selects the default page size.
    pub page_size: u64,
}

/// A product joined with its category.
///
/// `category` is `None` for uncategorized products and for products whose
/// category has been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
}

#[derive(Debug, Clone)]
pub struct CatalogQueryService<P, C> {
    products: P,
    categories: C,
    limits: PageLimits,
}

impl<P, C> CatalogQueryService<P, C>
where
    P: RecordStore<Product>,
    C: RecordStore<Category>,
{
    pub fn new(products: P, categories: C, limits: PageLimits) -> Self {
        Self {
            products,
            categories,
            limits,
        }
    }

    #[instrument(skip(self), err)]
    pub async fn list_products(&self, query: ProductQuery) -> CatalogResult<Page<ProductView>> {
        let filter = ProductFilter {
            name: query.name,
            category: query.category,
        };
        let request = self.limits.request(query.page, query.page_size);
        let page = self.products.list(&filter, request).await?;

        let mut categories: HashMap<CategoryId, Option<Category>> = HashMap::new();
        for category_id in page.items.iter().filter_map(|p| p.category_id) {
            if categories.contains_key(&category_id) {
                continue;
            }
            let category = self.category_for(category_id).await?;
            categories.insert(category_id, category);
        }

        Ok(page.map(|product| {
            let category = product
                .category_id
                .and_then(|id| categories.get(&id).cloned().flatten());
            ProductView { product, category }
        }))
    }

    /// Resolve the category of a single product.
    pub async fn view(&self, product: Product) -> CatalogResult<ProductView> {
        let category = match product.category_id {
            Some(id) => self.category_for(id).await?,
            None => None,
        };
        Ok(ProductView { product, category })
    }

    #[instrument(skip(self), err)]
    pub async fn list_categories(&self, page: u64, page_size: u64) -> CatalogResult<Page<Category>> {
        let request = self.limits.request(page, page_size);
        Ok(self
            .categories
            .list(&CategoryFilter::default(), request)
            .await?)
    }

    async fn category_for(&self, id: CategoryId) -> CatalogResult<Option<Category>> {
        match self.categories.find_by_id(&id).await {
            Ok(category) => Ok(Some(category)),
            Err(StoreError::NotFound { .. }) => {
                tracing::debug!(category_id = %id, "dangling category reference");
                Ok(None)
            }
            Err(other) => Err(other.into()),
        }
    }
}
