//! Rebuilding class trees from flat parent-pointer rows.

use std::collections::HashMap;

use taxonomy_core::{CatalogError, CatalogResult, ClassId, ClassRow, ClassTree, NewClass};

/// Reconstruct every class row into a forest.
///
/// Rows without a parent become roots. Roots and siblings are ordered by id,
/// which is creation order. A row pointing at a parent that is not among the
/// rows, a duplicated id, or a row unreachable from any root (a cycle) is an
/// `Internal` error: storage lost referential integrity.
pub fn build_forest(rows: &[ClassRow]) -> CatalogResult<Vec<ClassTree>> {
    let index = index_rows(rows)?;

    let mut roots: Vec<ClassId> = Vec::new();
    let mut children: HashMap<ClassId, Vec<ClassId>> = HashMap::new();
    for row in rows {
        match row.parent {
            None => roots.push(row.id),
            Some(parent) => {
                if !index.contains_key(&parent) {
                    return Err(CatalogError::internal(format!(
                        "class {} references missing parent {}",
                        row.id, parent
                    )));
                }
                children.entry(parent).or_default().push(row.id);
            }
        }
    }
    roots.sort();
    for list in children.values_mut() {
        list.sort();
    }

    let forest: Vec<ClassTree> = roots
        .into_iter()
        .map(|id| assemble(id, &index, &children))
        .collect();

    let placed: usize = forest.iter().map(ClassTree::node_count).sum();
    if placed != rows.len() {
        return Err(CatalogError::internal(format!(
            "{} class rows are not reachable from any root",
            rows.len() - placed
        )));
    }
    Ok(forest)
}

/// Attach `descendants` under `root`, each to its direct parent.
///
/// `root` becomes the returned tree's root regardless of its own parent.
/// Descendants are expected in discovery order (breadth-first from the root)
/// and must each name a parent already placed.
pub fn build_subtree(root: &ClassRow, descendants: &[ClassRow]) -> CatalogResult<ClassTree> {
    let mut all = Vec::with_capacity(descendants.len() + 1);
    all.push(ClassRow {
        parent: None,
        ..root.clone()
    });
    all.extend(descendants.iter().cloned());

    let mut forest = build_forest(&all)?;
    if forest.len() != 1 {
        return Err(CatalogError::internal(format!(
            "subtree of class {} has {} roots",
            root.id,
            forest.len()
        )));
    }
    let mut tree = forest.remove(0);
    tree.parent = root.parent;
    Ok(tree)
}

/// True when `tree` has the same names and the same parent/child edges as the
/// submitted `class`, ignoring sibling order.
pub fn isomorphic(tree: &ClassTree, class: &NewClass) -> bool {
    if tree.name != class.name || tree.children.len() != class.children.len() {
        return false;
    }
    class.children.iter().all(|submitted| {
        tree.children
            .iter()
            .find(|c| c.name == submitted.name)
            .is_some_and(|c| isomorphic(c, submitted))
    })
}

fn index_rows(rows: &[ClassRow]) -> CatalogResult<HashMap<ClassId, &ClassRow>> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        if index.insert(row.id, row).is_some() {
            return Err(CatalogError::internal(format!("duplicate class id {}", row.id)));
        }
    }
    Ok(index)
}

fn assemble(
    id: ClassId,
    index: &HashMap<ClassId, &ClassRow>,
    children: &HashMap<ClassId, Vec<ClassId>>,
) -> ClassTree {
    let row = index[&id];
    ClassTree {
        id,
        name: row.name.clone(),
        parent: row.parent,
        children: children
            .get(&id)
            .map(|kids| kids.iter().map(|k| assemble(*k, index, children)).collect())
            .unwrap_or_default(),
    }
}
