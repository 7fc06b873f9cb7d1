//! Record storage: the store contract and its backends.

pub mod r#trait;

pub mod in_memory;
pub mod postgres;
pub mod retry;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresCatalogStore;
pub use retry::{Attempts, RetryPolicy, RetryingStore};
pub use r#trait::{RecordStore, StoreError};
