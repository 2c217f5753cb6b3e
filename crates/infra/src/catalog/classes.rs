use std::collections::{HashSet, VecDeque};

use tracing::{debug, instrument};

use taxonomy_core::{
    CatalogError, CatalogResult, Class, ClassId, ClassParam, ClassRow, ClassTree, NewClass,
};
use taxonomy_hierarchy::{build_forest, build_subtree, plan_subtree};

use super::registry::ensure_param;
use super::{Catalog, finish, load_class, resolve_attributes};
use crate::store::{CatalogStore, CatalogTx};

impl<S: CatalogStore> Catalog<S> {
    /// Create several root trees in one unit of work; returns each root's id.
    #[instrument(skip(self, classes), fields(count = classes.len()), err)]
    pub async fn create_classes(&self, classes: &[NewClass]) -> CatalogResult<Vec<ClassId>> {
        let mut tx = self.begin().await?;
        let result = async {
            let mut ids = Vec::with_capacity(classes.len());
            for class in classes {
                ids.push(create_subtree(&mut tx, class, None).await?);
            }
            Ok::<_, CatalogError>(ids)
        }
        .await;
        finish(tx, "create_classes", result).await
    }

    /// Create `class` and its whole subtree, preorder.
    ///
    /// With `parent` the subtree hangs under that class. Without it, or with a
    /// zero id, the class becomes a root and its name must not already be taken.
    #[instrument(skip(self, class), fields(class = %class.name), err)]
    pub async fn create_subtree(
        &self,
        class: &NewClass,
        parent: Option<ClassId>,
    ) -> CatalogResult<ClassId> {
        let mut tx = self.begin().await?;
        let result = create_subtree(&mut tx, class, parent).await;
        finish(tx, "create_subtree", result).await
    }

    /// One class with its unit. `include_inherited` selects between the
    /// class's own params and its full attribute closure (ancestor-first).
    #[instrument(skip(self), err)]
    pub async fn read_class(&self, id: ClassId, include_inherited: bool) -> CatalogResult<Class> {
        let mut tx = self.begin().await?;
        let result = load_class(&mut tx, id, include_inherited).await;
        finish(tx, "read_class", result).await
    }

    /// Every class param visible to `id`, root's first.
    #[instrument(skip(self), err)]
    pub async fn resolve_attributes(&self, id: ClassId) -> CatalogResult<Vec<ClassParam>> {
        let mut tx = self.begin().await?;
        let result = resolve_attributes(&mut tx, id).await;
        finish(tx, "resolve_attributes", result).await
    }

    /// The whole hierarchy as a forest of root trees.
    #[instrument(skip(self), err)]
    pub async fn read_class_tree(&self) -> CatalogResult<Vec<ClassTree>> {
        let mut tx = self.begin().await?;
        let result = async {
            let rows = tx.list_classes().await?;
            build_forest(&rows)
        }
        .await;
        finish(tx, "read_class_tree", result).await
    }

    /// The class named `name` with all of its descendants.
    #[instrument(skip(self), err)]
    pub async fn read_subtree(&self, name: &str) -> CatalogResult<ClassTree> {
        let mut tx = self.begin().await?;
        let result = read_subtree(&mut tx, name).await;
        finish(tx, "read_subtree", result).await
    }

    /// Replace class `id` (and everything below it) with `class`.
    ///
    /// This is a destructive replace, not a patch: the stored class, its
    /// descendants and every product attached to them are deleted, then the
    /// submitted subtree is created under the old parent. Returns the new id.
    #[instrument(skip(self, class), fields(class = %class.name), err)]
    pub async fn update_class(&self, id: ClassId, class: &NewClass) -> CatalogResult<ClassId> {
        let mut tx = self.begin().await?;
        let result = async {
            plan_subtree(class)?;
            let existing = tx
                .get_class(id)
                .await?
                .ok_or_else(|| CatalogError::not_found(format!("class {} not found", id)))?;
            tx.delete_class(id).await?;
            debug!(class = %id, "deleted class for replacement");
            create_subtree(&mut tx, class, existing.parent).await
        }
        .await;
        finish(tx, "update_class", result).await
    }

    /// Delete a class, its descendants and their products.
    #[instrument(skip(self), err)]
    pub async fn delete_class(&self, id: ClassId) -> CatalogResult<()> {
        let mut tx = self.begin().await?;
        let result = match tx.delete_class(id).await {
            Ok(true) => {
                debug!(class = %id, "deleted class");
                Ok(())
            }
            Ok(false) => Err(CatalogError::not_found(format!("class {} not found", id))),
            Err(e) => Err(e.into()),
        };
        finish(tx, "delete_class", result).await
    }
}

async fn create_subtree<T: CatalogTx>(
    tx: &mut T,
    root: &NewClass,
    parent: Option<ClassId>,
) -> CatalogResult<ClassId> {
    let plan = plan_subtree(root)?;
    let parent = parent.filter(|id| id.get() != 0);

    match parent {
        Some(parent) => {
            if tx.get_class(parent).await?.is_none() {
                return Err(CatalogError::not_found(format!(
                    "parent class {} not found",
                    parent
                )));
            }
        }
        None => {
            if let Some(existing) = tx.find_class_by_name(&root.name).await? {
                return Err(CatalogError::conflict(format!(
                    "class '{}' already exists (id {})",
                    root.name, existing.id
                )));
            }
        }
    }

    let mut ids: Vec<ClassId> = Vec::with_capacity(plan.len());
    for planned in &plan {
        let class = planned.class;
        let parent_id = match planned.parent_slot {
            Some(slot) => Some(ids[slot]),
            None => parent,
        };
        let unit = tx.find_unit_by_name(&class.unit).await?.ok_or_else(|| {
            CatalogError::not_found(format!(
                "organizational unit '{}' of class '{}' not found",
                class.unit, class.name
            ))
        })?;

        let id = tx.insert_class(&class.name, parent_id, unit.id).await?;
        debug!(class = %id, name = %class.name, depth = planned.depth, "inserted class");

        for param in &class.params {
            let param_id = ensure_param(tx, param).await?;
            tx.insert_class_param(id, param_id).await?;
        }
        ids.push(id);
    }

    ids.first()
        .copied()
        .ok_or_else(|| CatalogError::internal("empty class plan"))
}

/// Resolve `name` and walk child edges breadth-first.
pub(super) async fn read_subtree<T: CatalogTx>(tx: &mut T, name: &str) -> CatalogResult<ClassTree> {
    let root = tx
        .find_class_by_name(name)
        .await?
        .ok_or_else(|| CatalogError::not_found(format!("class '{}' not found", name)))?;

    let mut seen = HashSet::from([root.id]);
    let mut queue = VecDeque::from([root.id]);
    let mut descendants: Vec<ClassRow> = Vec::new();
    while let Some(id) = queue.pop_front() {
        for child in tx.children_of(id).await? {
            if !seen.insert(child.id) {
                return Err(CatalogError::internal(format!(
                    "class {} is reachable twice below '{}'",
                    child.id, name
                )));
            }
            queue.push_back(child.id);
            descendants.push(child);
        }
    }
    build_subtree(&root, &descendants)
}
