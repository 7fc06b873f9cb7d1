//! `stockroom-core`: foundation building blocks shared by the catalog.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the record/revision model used for optimistic concurrency,
//! pagination, and the domain error type.

pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod record;
pub mod revision;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, Identifier, ProductId};
pub use page::{Page, PageRequest};
pub use record::{Record, RecordMeta};
pub use revision::ExpectedRevision;
pub use value_object::ValueObject;
