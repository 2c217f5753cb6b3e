//! Binding submitted `(param name, value)` pairs to declaring class params.

use std::collections::{HashMap, HashSet};

use taxonomy_core::{CatalogError, CatalogResult, ClassParam, ClassParamId, NewValue};

/// A product value resolved to the class param that declared its attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundValue {
    pub class_param_id: ClassParamId,
    pub value: String,
}

/// Resolve each value against the attribute closure of the product's class.
///
/// `closure` is ordered ancestor-first. When one param name is declared at
/// several levels, the declaration closest to the product's class wins.
/// A name outside the closure is `NotFound`; a name supplied twice is a
/// `Conflict` (one value per declaring class param).
pub fn bind_values(
    product: &str,
    closure: &[ClassParam],
    values: &[NewValue],
) -> CatalogResult<Vec<BoundValue>> {
    let mut by_name: HashMap<&str, ClassParamId> = HashMap::with_capacity(closure.len());
    for cp in closure {
        by_name.insert(cp.param.name.as_str(), cp.id);
    }

    let mut seen = HashSet::with_capacity(values.len());
    let mut bound = Vec::with_capacity(values.len());
    for value in values {
        let class_param_id = *by_name.get(value.param.as_str()).ok_or_else(|| {
            CatalogError::not_found(format!(
                "param '{}' is not declared by the class of product '{}' or its ancestors",
                value.param, product
            ))
        })?;
        if !seen.insert(class_param_id) {
            return Err(CatalogError::conflict(format!(
                "product '{}' has more than one value for param '{}'",
                product, value.param
            )));
        }
        bound.push(BoundValue {
            class_param_id,
            value: value.value.clone(),
        });
    }
    Ok(bound)
}
