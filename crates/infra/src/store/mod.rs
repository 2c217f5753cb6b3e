//! Transactional storage boundary for the catalog relations.
//!
//! The engine only talks to [`CatalogStore`] / [`CatalogTx`]; backends decide
//! how rows, constraints and cascades are kept.

pub mod in_memory;
pub mod postgres;
pub mod schema;
pub mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use r#trait::{CatalogStore, CatalogTx, StoreError, StoreResult};
