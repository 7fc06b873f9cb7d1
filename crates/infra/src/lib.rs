//! Infrastructure layer: record stores, the stock engine, the catalog
//! service facade and runtime configuration.

pub mod cas;
pub mod config;
pub mod error;
pub mod query;
pub mod service;
pub mod stock;
pub mod store;

pub use config::{ConfigError, StockroomConfig};
pub use error::{CatalogError, CatalogResult};
pub use query::{CatalogQueryService, PageLimits, ProductQuery, ProductView};
pub use service::CatalogService;
pub use stock::StockAdjuster;
