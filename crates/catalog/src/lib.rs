//! Catalog domain module: products, categories and the stock rule.
//!
//! This crate contains the catalog records and their business rules,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod category;
pub mod filter;
pub mod price;
pub mod product;
pub mod stock;

pub use category::{Category, CategoryFilter, CategoryUpdate, NewCategory};
pub use filter::NameFilter;
pub use price::Price;
pub use product::{NewProduct, Product, ProductFilter, ProductUpdate};
pub use stock::{StockLevel, apply_delta};
