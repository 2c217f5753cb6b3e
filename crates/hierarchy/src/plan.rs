//! Preorder planning of a submitted subtree.
//!
//! Every child insert needs its parent's freshly assigned id, so creation is a
//! strict preorder sequence. The plan validates the whole submission up front
//! and tells the caller which earlier slot each node hangs under.

use std::collections::HashSet;

use taxonomy_core::{CatalogError, CatalogResult, NewClass, ensure_name};

/// One class of a submitted subtree, in insertion order.
#[derive(Debug, Clone, Copy)]
pub struct PlannedClass<'a> {
    pub class: &'a NewClass,
    /// Index of the parent within the plan; `None` for the submitted root.
    pub parent_slot: Option<usize>,
    pub depth: usize,
}

/// Flatten `root` into preorder and validate it.
///
/// Rejects blank names, a class name repeated within the submission, and a
/// param name repeated within one class.
pub fn plan_subtree(root: &NewClass) -> CatalogResult<Vec<PlannedClass<'_>>> {
    let mut plan = Vec::new();
    let mut names = HashSet::new();
    let mut stack = vec![PlannedClass {
        class: root,
        parent_slot: None,
        depth: 0,
    }];

    while let Some(planned) = stack.pop() {
        let class = planned.class;
        validate_class(class)?;
        if !names.insert(class.name.as_str()) {
            return Err(CatalogError::conflict(format!(
                "class '{}' is submitted more than once",
                class.name
            )));
        }

        let slot = plan.len();
        plan.push(planned);
        stack.extend(class.children.iter().rev().map(|child| PlannedClass {
            class: child,
            parent_slot: Some(slot),
            depth: planned.depth + 1,
        }));
    }
    Ok(plan)
}

fn validate_class(class: &NewClass) -> CatalogResult<()> {
    ensure_name("class", &class.name)?;
    ensure_name("organizational unit", &class.unit)?;

    let mut params = HashSet::new();
    for param in &class.params {
        ensure_name("param", &param.name)?;
        ensure_name("value type", &param.value_type)?;
        ensure_name("organizational unit", &param.unit)?;
        if !params.insert(param.name.as_str()) {
            return Err(CatalogError::conflict(format!(
                "param '{}' is declared twice on class '{}'",
                param.name, class.name
            )));
        }
    }
    Ok(())
}
