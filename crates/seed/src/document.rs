//! Seed document format and loader.
//!
//! ```json
//! {
//!   "units": [{ "name": "U1", "short_name": "u1" }],
//!   "value_types": ["string", "int"],
//!   "classes": [{ "name": "Vehicle", "unit": "U1", "params": [], "children": [] }],
//!   "products": [{ "name": "Tesla", "class": "Car", "values": [] }]
//! }
//! ```
//!
//! Every section is optional. Sections load in the order above, each as its
//! own unit of work, so a failing section leaves earlier ones in place.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use taxonomy_core::{NewClass, NewProduct, NewUnit};
use taxonomy_infra::{Catalog, CatalogStore};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedDocument {
    #[serde(default)]
    pub units: Vec<NewUnit>,
    #[serde(default)]
    pub value_types: Vec<String>,
    #[serde(default)]
    pub classes: Vec<NewClass>,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub units: usize,
    pub value_types: usize,
    pub root_classes: usize,
    pub products: usize,
}

impl SeedDocument {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("malformed seed document")
    }
}

pub async fn load<S: CatalogStore>(
    catalog: &Catalog<S>,
    doc: &SeedDocument,
) -> anyhow::Result<SeedSummary> {
    let units = catalog
        .ensure_units(&doc.units)
        .await
        .context("loading organizational units")?;
    let value_types = catalog
        .ensure_value_types(&doc.value_types)
        .await
        .context("loading value types")?;
    let roots = catalog
        .create_classes(&doc.classes)
        .await
        .context("loading classes")?;
    let products = catalog
        .create_products(&doc.products)
        .await
        .context("loading products")?;

    let summary = SeedSummary {
        units: units.len(),
        value_types: value_types.len(),
        root_classes: roots.len(),
        products: products.len(),
    };
    info!(?summary, "seed document loaded");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxonomy_core::CatalogError;
    use taxonomy_infra::InMemoryCatalogStore;

    const DOC: &str = r#"{
        "units": [{ "name": "U1", "short_name": "u1" }],
        "value_types": ["string", "int"],
        "classes": [{
            "name": "Vehicle",
            "unit": "U1",
            "params": [{ "name": "color", "value_type": "string", "unit": "U1" }],
            "children": [{
                "name": "Car",
                "unit": "U1",
                "params": [{ "name": "doors", "value_type": "int", "unit": "U1" }]
            }]
        }],
        "products": [{
            "name": "Tesla",
            "class": "Car",
            "values": [{ "param": "color", "value": "red" }, { "param": "doors", "value": "4" }]
        }]
    }"#;

    #[test]
    fn sections_are_optional() {
        let doc = SeedDocument::from_json(r#"{ "value_types": ["string"] }"#).unwrap();
        assert!(doc.units.is_empty());
        assert_eq!(doc.value_types, vec!["string".to_string()]);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(SeedDocument::from_json(r#"{ "widgets": [] }"#).is_err());
    }

    #[tokio::test]
    async fn loads_a_full_document() {
        let catalog = Catalog::new(InMemoryCatalogStore::new());
        let doc = SeedDocument::from_json(DOC).unwrap();

        let summary = load(&catalog, &doc).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                units: 1,
                value_types: 2,
                root_classes: 1,
                products: 1,
            }
        );

        let forest = catalog.read_class_tree().await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].children[0].name, "Car");
    }

    #[tokio::test]
    async fn product_on_inner_class_fails_the_products_section() {
        let catalog = Catalog::new(InMemoryCatalogStore::new());
        let mut doc = SeedDocument::from_json(DOC).unwrap();
        doc.products[0].class = "Vehicle".to_string();
        doc.products[0].values.clear();

        let err = load(&catalog, &doc).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::InvalidPlacement(_))
        ));
        // Earlier sections stay loaded.
        assert_eq!(catalog.read_class_tree().await.unwrap().len(), 1);
    }
}
