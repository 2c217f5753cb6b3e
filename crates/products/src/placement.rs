//! Leaf-only placement of products.

use taxonomy_core::{CatalogError, CatalogResult, ClassTree, NewProduct, ensure_name};

/// Check the submission itself before touching storage.
pub fn validate_product(product: &NewProduct) -> CatalogResult<()> {
    ensure_name("product", &product.name)?;
    ensure_name("class", &product.class)?;
    for value in &product.values {
        ensure_name("param", &value.param)?;
    }
    Ok(())
}

/// Products may only attach to classes without children.
pub fn ensure_leaf(class: &ClassTree) -> CatalogResult<()> {
    if !class.is_leaf() {
        return Err(CatalogError::invalid_placement(format!(
            "class '{}' has {} child classes; products attach only to leaf classes",
            class.name,
            class.children.len()
        )));
    }
    Ok(())
}
