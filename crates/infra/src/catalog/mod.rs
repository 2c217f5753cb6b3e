//! Catalog engine: atomic operations over a [`CatalogStore`].
//!
//! `Catalog` is the application-level orchestration for the taxonomy. It
//! composes the pure rules from `taxonomy-hierarchy` and `taxonomy-products`
//! with the storage seam, running every public operation as one unit of work:
//!
//! ```text
//! begin
//!   ↓
//! validate submission (pure)
//!   ↓
//! reads + writes through the transaction handle
//!   ↓
//! commit          (on Ok)
//! rollback        (on Err; a rollback failure is logged, the original error returned)
//! ```
//!
//! ## Destructive updates
//!
//! `update_class` and `update_product` **replace** what they target. Updating
//! a class deletes it (with its descendants, their params and their products)
//! and recreates exactly the submitted subtree under the same parent. Updating
//! a product deletes it and recreates it from the submission. Neither merges
//! with stored state, and both return the id of the recreated row.
//!
//! The engine takes no locks of its own; concurrent callers touching the same
//! rows get whatever isolation the store provides.

mod classes;
mod products;
mod registry;

use tracing::error;

use taxonomy_core::{
    CatalogError, CatalogResult, Class, ClassId, ClassParam, ClassParamRow, OrganizationalUnit,
    Param, ParamRow, UnitId,
};
use taxonomy_hierarchy::{AncestorWalk, attribute_closure};

use crate::store::{CatalogStore, CatalogTx};

/// Taxonomy engine over an injected store.
#[derive(Debug, Clone)]
pub struct Catalog<S> {
    store: S,
}

impl<S> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: CatalogStore> Catalog<S> {
    async fn begin(&self) -> CatalogResult<S::Tx> {
        Ok(self.store.begin().await?)
    }
}

/// Commit on success, roll back on failure.
async fn finish<T, R>(tx: T, operation: &'static str, result: CatalogResult<R>) -> CatalogResult<R>
where
    T: CatalogTx,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(
                    operation,
                    error = %rollback_err,
                    original = %err,
                    "rollback failed"
                );
            }
            Err(err)
        }
    }
}

async fn load_unit<T: CatalogTx>(tx: &mut T, id: UnitId) -> CatalogResult<OrganizationalUnit> {
    tx.get_unit(id)
        .await?
        .ok_or_else(|| CatalogError::not_found(format!("organizational unit {} not found", id)))
}

/// Join a param row with its value type and (optional) owning unit.
async fn hydrate_param<T: CatalogTx>(tx: &mut T, row: ParamRow) -> CatalogResult<Param> {
    let value_type = tx.get_value_type(row.value_type_id).await?.ok_or_else(|| {
        CatalogError::internal(format!(
            "param '{}' references missing value type {}",
            row.name, row.value_type_id
        ))
    })?;
    let owner_unit = match row.unit_id {
        Some(unit) => tx.get_unit(unit).await?,
        None => None,
    };
    Ok(Param {
        id: row.id,
        name: row.name,
        value_type,
        owner_unit,
    })
}

async fn hydrate_class_param<T: CatalogTx>(
    tx: &mut T,
    row: ClassParamRow,
) -> CatalogResult<ClassParam> {
    let param = tx.get_param(row.param_id).await?.ok_or_else(|| {
        CatalogError::internal(format!(
            "class param {} references missing param {}",
            row.id, row.param_id
        ))
    })?;
    Ok(ClassParam {
        id: row.id,
        class_id: row.class_id,
        param: hydrate_param(tx, param).await?,
    })
}

async fn class_params_of<T: CatalogTx>(
    tx: &mut T,
    classes: &[ClassId],
) -> CatalogResult<Vec<ClassParam>> {
    let rows = tx.class_params_of(classes).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(hydrate_class_param(tx, row).await?);
    }
    Ok(out)
}

/// Classes from the root down to `id`.
async fn ancestor_chain<T: CatalogTx>(tx: &mut T, id: ClassId) -> CatalogResult<Vec<ClassId>> {
    let mut walk = AncestorWalk::start(id);
    let mut parent = tx
        .get_class(id)
        .await?
        .ok_or_else(|| CatalogError::not_found(format!("class {} not found", id)))?
        .parent;

    while let Some(next) = parent {
        walk.climb(next)?;
        parent = tx
            .get_class(next)
            .await?
            .ok_or_else(|| {
                CatalogError::internal(format!(
                    "class {} references missing parent {}",
                    walk.current(),
                    next
                ))
            })?
            .parent;
    }
    Ok(walk.root_first())
}

/// Own params of `id` plus every ancestor's, ancestor-first.
async fn resolve_attributes<T: CatalogTx>(
    tx: &mut T,
    id: ClassId,
) -> CatalogResult<Vec<ClassParam>> {
    let chain = ancestor_chain(tx, id).await?;
    let declared = class_params_of(tx, &chain).await?;
    Ok(attribute_closure(&chain, declared))
}

async fn load_class<T: CatalogTx>(
    tx: &mut T,
    id: ClassId,
    include_inherited: bool,
) -> CatalogResult<Class> {
    let row = tx
        .get_class(id)
        .await?
        .ok_or_else(|| CatalogError::not_found(format!("class {} not found", id)))?;
    let unit = load_unit(tx, row.unit_id).await?;
    let params = if include_inherited {
        resolve_attributes(tx, id).await?
    } else {
        class_params_of(tx, &[id]).await?
    };
    Ok(Class {
        id: row.id,
        name: row.name,
        parent: row.parent,
        unit,
        params,
    })
}
