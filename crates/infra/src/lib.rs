//! Infrastructure layer: storage backends, schema bootstrap, config, and the
//! catalog engine that runs each operation as one unit of work.

pub mod catalog;
pub mod config;
pub mod store;

pub use catalog::Catalog;
pub use config::{ConfigError, StoreConfig};
pub use store::{
    CatalogStore, CatalogTx, InMemoryCatalogStore, PostgresCatalogStore, StoreError, StoreResult,
};

#[cfg(test)]
mod integration_tests;
