use serde::{Deserialize, Serialize};

use stockroom_core::{
    CategoryId, DomainError, DomainResult, Entity, Identifier, ProductId, Record, RecordMeta,
};

use crate::filter::NameFilter;
use crate::price::Price;

/// Record: Product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    /// Quantity on hand; never negative.
    pub stock: i64,
    /// `None` means uncategorized.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

/// Parameters for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// Partial product update, merged onto the stored record before a full replace.
///
/// `None` fields are left untouched. `category_id: Some(None)` clears the
/// category reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<i64>,
    pub category_id: Option<Option<CategoryId>>,
}

/// Typed product filter; all present terms must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub name: Option<NameFilter>,
    pub category: Option<CategoryId>,
}

impl Product {
    /// Build an unsaved product (nil identifier, placeholder metadata).
    pub fn draft(params: NewProduct) -> DomainResult<Self> {
        let product = Self {
            id: ProductId::nil(),
            name: params.name.trim().to_string(),
            description: params.description,
            price: params.price,
            stock: params.stock,
            category_id: params.category_id,
            meta: RecordMeta::unsaved(),
        };
        product.validate()?;
        Ok(product)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if self.price > Price::MAX {
            return Err(DomainError::validation(format!(
                "price exceeds the maximum of {}",
                Price::MAX
            )));
        }
        Ok(())
    }
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The category this update points the product at, if it changes it.
    pub fn new_category(&self) -> Option<CategoryId> {
        self.category_id.flatten()
    }

    /// Merge onto `current`, returning the validated replacement record.
    pub fn apply(&self, current: &Product) -> DomainResult<Product> {
        let mut next = current.clone();
        if let Some(name) = &self.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            next.price = price;
        }
        if let Some(stock) = self.stock {
            next.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            next.category_id = category_id;
        }
        next.validate()?;
        Ok(next)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Product {
    type Filter = ProductFilter;

    const KIND: &'static str = "product";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id;
    }

    fn matches(&self, filter: &ProductFilter) -> bool {
        if let Some(name) = &filter.name {
            if !name.matches(&self.name) {
                return false;
            }
        }
        if let Some(category) = filter.category {
            if self.category_id != Some(category) {
                return false;
            }
        }
        true
    }
}
