//! Flat registries: organizational units, value types and params.

use tracing::{debug, instrument};

use taxonomy_core::{
    CatalogError, CatalogResult, NewParam, NewUnit, OrganizationalUnit, Param, ParamId, UnitId,
    ValueType, ValueTypeId, ensure_name,
};

use super::{Catalog, finish, hydrate_param};
use crate::store::{CatalogStore, CatalogTx};

impl<S: CatalogStore> Catalog<S> {
    /// Get-or-create each unit by name; ids come back in input order.
    ///
    /// An existing unit keeps its stored short name.
    #[instrument(skip(self, units), fields(count = units.len()), err)]
    pub async fn ensure_units(&self, units: &[NewUnit]) -> CatalogResult<Vec<UnitId>> {
        let mut tx = self.begin().await?;
        let result = async {
            let mut ids = Vec::with_capacity(units.len());
            for unit in units {
                ids.push(ensure_unit(&mut tx, unit).await?);
            }
            Ok::<_, CatalogError>(ids)
        }
        .await;
        finish(tx, "ensure_units", result).await
    }

    /// All units, or only the one named `name`.
    #[instrument(skip(self), err)]
    pub async fn list_units(&self, name: Option<&str>) -> CatalogResult<Vec<OrganizationalUnit>> {
        let mut tx = self.begin().await?;
        let result = tx.list_units(name).await.map_err(CatalogError::from);
        finish(tx, "list_units", result).await
    }

    /// Delete a unit together with the classes it owns.
    ///
    /// Params owned by the unit survive, unassigned.
    #[instrument(skip(self), err)]
    pub async fn delete_unit(&self, id: UnitId) -> CatalogResult<()> {
        let mut tx = self.begin().await?;
        let result = match tx.delete_unit(id).await {
            Ok(true) => {
                debug!(unit = %id, "deleted organizational unit");
                Ok(())
            }
            Ok(false) => Err(CatalogError::not_found(format!(
                "organizational unit {} not found",
                id
            ))),
            Err(e) => Err(e.into()),
        };
        finish(tx, "delete_unit", result).await
    }

    #[instrument(skip(self, names), fields(count = names.len()), err)]
    pub async fn ensure_value_types(&self, names: &[String]) -> CatalogResult<Vec<ValueTypeId>> {
        let mut tx = self.begin().await?;
        let result = async {
            let mut ids = Vec::with_capacity(names.len());
            for name in names {
                ids.push(ensure_value_type(&mut tx, name).await?);
            }
            Ok::<_, CatalogError>(ids)
        }
        .await;
        finish(tx, "ensure_value_types", result).await
    }

    #[instrument(skip(self), err)]
    pub async fn list_value_types(&self, name: Option<&str>) -> CatalogResult<Vec<ValueType>> {
        let mut tx = self.begin().await?;
        let result = tx.list_value_types(name).await.map_err(CatalogError::from);
        finish(tx, "list_value_types", result).await
    }

    /// Delete a value type and every param of that type.
    #[instrument(skip(self), err)]
    pub async fn delete_value_type(&self, id: ValueTypeId) -> CatalogResult<()> {
        let mut tx = self.begin().await?;
        let result = match tx.delete_value_type(id).await {
            Ok(true) => {
                debug!(value_type = %id, "deleted value type");
                Ok(())
            }
            Ok(false) => Err(CatalogError::not_found(format!(
                "value type {} not found",
                id
            ))),
            Err(e) => Err(e.into()),
        };
        finish(tx, "delete_value_type", result).await
    }

    /// Get-or-create a param; its value type and unit must already exist.
    #[instrument(skip(self, param), fields(param = %param.name), err)]
    pub async fn ensure_param(&self, param: &NewParam) -> CatalogResult<ParamId> {
        let mut tx = self.begin().await?;
        let result = ensure_param(&mut tx, param).await;
        finish(tx, "ensure_param", result).await
    }

    #[instrument(skip(self), err)]
    pub async fn list_params(&self, name: Option<&str>) -> CatalogResult<Vec<Param>> {
        let mut tx = self.begin().await?;
        let result = async {
            let rows = tx.list_params(name).await?;
            let mut params = Vec::with_capacity(rows.len());
            for row in rows {
                params.push(hydrate_param(&mut tx, row).await?);
            }
            Ok::<_, CatalogError>(params)
        }
        .await;
        finish(tx, "list_params", result).await
    }
}

async fn ensure_unit<T: CatalogTx>(tx: &mut T, unit: &NewUnit) -> CatalogResult<UnitId> {
    ensure_name("organizational unit", &unit.name)?;
    if let Some(existing) = tx.find_unit_by_name(&unit.name).await? {
        return Ok(existing.id);
    }
    let id = tx.insert_unit(&unit.name, &unit.short_name).await?;
    debug!(unit = %id, name = %unit.name, "inserted organizational unit");
    Ok(id)
}

async fn ensure_value_type<T: CatalogTx>(tx: &mut T, name: &str) -> CatalogResult<ValueTypeId> {
    ensure_name("value type", name)?;
    if let Some(existing) = tx.find_value_type_by_name(name).await? {
        return Ok(existing.id);
    }
    let id = tx.insert_value_type(name).await?;
    debug!(value_type = %id, name, "inserted value type");
    Ok(id)
}

/// Resolve a param declaration by name, creating the param if absent.
///
/// A stored param with the same name must agree on value type, and on owning
/// unit unless it has been left unassigned.
pub(super) async fn ensure_param<T: CatalogTx>(
    tx: &mut T,
    param: &NewParam,
) -> CatalogResult<ParamId> {
    ensure_name("param", &param.name)?;

    let value_type = tx
        .find_value_type_by_name(&param.value_type)
        .await?
        .ok_or_else(|| {
            CatalogError::not_found(format!(
                "value type '{}' of param '{}' not found",
                param.value_type, param.name
            ))
        })?;
    let unit = tx.find_unit_by_name(&param.unit).await?.ok_or_else(|| {
        CatalogError::not_found(format!(
            "organizational unit '{}' of param '{}' not found",
            param.unit, param.name
        ))
    })?;

    if let Some(existing) = tx.find_param_by_name(&param.name).await? {
        let same_unit = existing.unit_id.is_none_or(|u| u == unit.id);
        if existing.value_type_id != value_type.id || !same_unit {
            return Err(CatalogError::conflict(format!(
                "param '{}' already exists with a different value type or unit",
                param.name
            )));
        }
        return Ok(existing.id);
    }

    let id = tx.insert_param(&param.name, value_type.id, unit.id).await?;
    debug!(param = %id, name = %param.name, "inserted param");
    Ok(id)
}
