//! Load a JSON seed document into the configured catalog store and print the
//! resulting class forest.
//!
//! Usage: `taxonomy-seed <seed.json>`

mod document;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use taxonomy_core::ClassTree;
use taxonomy_infra::{
    Catalog, CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreConfig,
};

use crate::document::{SeedDocument, SeedSummary, load};

#[derive(Debug, Serialize)]
struct Report {
    summary: SeedSummary,
    classes: Vec<ClassTree>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    taxonomy_observability::init();

    let path = std::env::args()
        .nth(1)
        .context("usage: taxonomy-seed <seed.json>")?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let doc = SeedDocument::from_json(&raw)?;

    let report = match StoreConfig::from_env()? {
        StoreConfig::InMemory => {
            warn!("USE_PERSISTENT_STORES is not enabled; seeding an in-memory catalog");
            seed(Catalog::new(InMemoryCatalogStore::new()), &doc).await?
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresCatalogStore::connect(&database_url, max_connections)
                .await
                .context("connecting to Postgres")?;
            store.ensure_schema().await.context("bootstrapping schema")?;
            seed(Catalog::new(store), &doc).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn seed<S: CatalogStore>(catalog: Catalog<S>, doc: &SeedDocument) -> anyhow::Result<Report> {
    let summary = load(&catalog, doc).await?;
    let classes = catalog.read_class_tree().await?;
    info!(roots = classes.len(), "catalog ready");
    Ok(Report { summary, classes })
}
