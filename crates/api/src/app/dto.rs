use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockroom_catalog::{
    CategoryUpdate, NameFilter, NewCategory, NewProduct, Price, ProductUpdate, StockLevel,
};
use stockroom_core::{CategoryId, ProductId};
use stockroom_infra::ProductQuery;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Decimal string (`"19.99"`) or JSON number.
    pub price: Price,
    #[serde(default)]
    pub stock: i64,
    /// Absent or nil UUID means uncategorized.
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(body: CreateProductRequest) -> Self {
        NewProduct {
            name: body.name,
            description: body.description,
            price: body.price,
            stock: body.stock,
            category_id: body.category_id.and_then(CategoryId::from_reference),
        }
    }
}

/// Partial update; absent fields are left unchanged. A nil `category_id`
/// clears the category.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<i64>,
    pub category_id: Option<Uuid>,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(body: UpdateProductRequest) -> Self {
        ProductUpdate {
            name: body.name,
            description: body.description,
            price: body.price,
            stock: body.stock,
            category_id: body.category_id.map(CategoryId::from_reference),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CreateCategoryRequest> for NewCategory {
    fn from(body: CreateCategoryRequest) -> Self {
        NewCategory {
            name: body.name,
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateCategoryRequest> for CategoryUpdate {
    fn from(body: UpdateCategoryRequest) -> Self {
        CategoryUpdate {
            name: body.name,
            description: body.description,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category_id: Option<String>,
    /// Exact, case-sensitive match.
    pub name: Option<String>,
    /// Case-insensitive substring match; ignored when `name` is given.
    pub name_contains: Option<String>,
}

impl ListProductsParams {
    pub fn into_query(self) -> Result<ProductQuery, axum::response::Response> {
        let category = match self.category_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<Uuid>() {
                Ok(uuid) => CategoryId::from_reference(uuid),
                Err(_) => return Err(errors::invalid_id("category")),
            },
        };

        let name = match (non_empty(self.name), non_empty(self.name_contains)) {
            (Some(exact), _) => Some(NameFilter::Equals(exact)),
            (None, Some(needle)) => Some(NameFilter::Contains(needle)),
            (None, None) => None,
        };

        Ok(ProductQuery {
            name,
            category,
            page: self.page.unwrap_or(1),
            page_size: self.limit.unwrap_or(0),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub id: ProductId,
    pub stock: i64,
    pub revision: u64,
}

impl From<StockLevel> for StockResponse {
    fn from(level: StockLevel) -> Self {
        Self {
            id: level.product_id,
            stock: level.stock,
            revision: level.revision,
        }
    }
}
