use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use taxonomy_core::{
    ClassId, ClassParamId, ClassParamRow, ClassRow, OrganizationalUnit, ParamId, ParamRow,
    ProductId, ProductRow, ProductValueRow, UnitId, ValueType, ValueTypeId,
};

use super::r#trait::{CatalogStore, CatalogTx, StoreError, StoreResult};

#[derive(Debug, Default, Clone)]
struct Serials {
    unit: i64,
    value_type: i64,
    param: i64,
    class: i64,
    class_param: i64,
    product: i64,
}

fn next(serial: &mut i64) -> i64 {
    *serial += 1;
    *serial
}

#[derive(Debug, Default, Clone)]
struct Tables {
    serials: Serials,
    units: BTreeMap<UnitId, OrganizationalUnit>,
    value_types: BTreeMap<ValueTypeId, ValueType>,
    params: BTreeMap<ParamId, ParamRow>,
    classes: BTreeMap<ClassId, ClassRow>,
    class_params: BTreeMap<ClassParamId, ClassParamRow>,
    products: BTreeMap<ProductId, ProductRow>,
    values: Vec<ProductValueRow>,
}

impl Tables {
    /// `id` plus every class below it.
    fn descendants_of(&self, id: ClassId) -> BTreeSet<ClassId> {
        let mut found = BTreeSet::from([id]);
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            for row in self.classes.values() {
                if row.parent == Some(parent) && found.insert(row.id) {
                    frontier.push(row.id);
                }
            }
        }
        found
    }

    fn cascade_classes(&mut self, doomed: &BTreeSet<ClassId>) {
        self.classes.retain(|id, _| !doomed.contains(id));

        let class_params: BTreeSet<ClassParamId> = self
            .class_params
            .values()
            .filter(|cp| doomed.contains(&cp.class_id))
            .map(|cp| cp.id)
            .collect();
        self.cascade_class_params(&class_params);

        let products: BTreeSet<ProductId> = self
            .products
            .values()
            .filter(|p| doomed.contains(&p.class_id))
            .map(|p| p.id)
            .collect();
        self.cascade_products(&products);
    }

    fn cascade_class_params(&mut self, doomed: &BTreeSet<ClassParamId>) {
        self.class_params.retain(|id, _| !doomed.contains(id));
        self.values.retain(|v| !doomed.contains(&v.class_param_id));
    }

    fn cascade_products(&mut self, doomed: &BTreeSet<ProductId>) {
        self.products.retain(|id, _| !doomed.contains(id));
        self.values.retain(|v| !doomed.contains(&v.product_id));
    }

    fn cascade_params(&mut self, doomed: &BTreeSet<ParamId>) {
        self.params.retain(|id, _| !doomed.contains(id));
        let class_params: BTreeSet<ClassParamId> = self
            .class_params
            .values()
            .filter(|cp| doomed.contains(&cp.param_id))
            .map(|cp| cp.id)
            .collect();
        self.cascade_class_params(&class_params);
    }
}

fn check_name(table: &str, name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::CheckViolation(format!("{table}.name must not be empty")));
    }
    Ok(())
}

fn duplicate(table: &str, name: &str) -> StoreError {
    StoreError::Conflict(format!("{table} '{name}' already exists"))
}

fn missing(what: &str, id: impl core::fmt::Display) -> StoreError {
    StoreError::MissingReference(format!("{what} {id} does not exist"))
}

/// In-memory catalog store.
///
/// Intended for tests/dev. A transaction holds the store lock for its whole
/// lifetime (fully serialised) and writes to a private copy of the tables,
/// which `commit` publishes and `rollback`/drop discards.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Unit of work over an [`InMemoryCatalogStore`].
#[derive(Debug)]
pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> StoreResult<InMemoryTx> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(InMemoryTx { guard, work })
    }
}

#[async_trait::async_trait]
impl CatalogTx for InMemoryTx {
    async fn commit(self) -> StoreResult<()> {
        let InMemoryTx { mut guard, work } = self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_unit_by_name(&mut self, name: &str) -> StoreResult<Option<OrganizationalUnit>> {
        Ok(self.work.units.values().find(|u| u.name == name).cloned())
    }

    async fn get_unit(&mut self, id: UnitId) -> StoreResult<Option<OrganizationalUnit>> {
        Ok(self.work.units.get(&id).cloned())
    }

    async fn insert_unit(&mut self, name: &str, short_name: &str) -> StoreResult<UnitId> {
        check_name("org_units", name)?;
        if self.work.units.values().any(|u| u.name == name) {
            return Err(duplicate("organizational unit", name));
        }
        let id = UnitId::new(next(&mut self.work.serials.unit));
        self.work.units.insert(
            id,
            OrganizationalUnit {
                id,
                name: name.to_string(),
                short_name: short_name.to_string(),
            },
        );
        Ok(id)
    }

    async fn list_units(&mut self, name: Option<&str>) -> StoreResult<Vec<OrganizationalUnit>> {
        Ok(self
            .work
            .units
            .values()
            .filter(|u| name.is_none_or(|n| u.name == n))
            .cloned()
            .collect())
    }

    async fn delete_unit(&mut self, id: UnitId) -> StoreResult<bool> {
        if self.work.units.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<ClassId> = self
            .work
            .classes
            .values()
            .filter(|c| c.unit_id == id)
            .map(|c| c.id)
            .collect();
        let mut doomed = BTreeSet::new();
        for class in owned {
            doomed.extend(self.work.descendants_of(class));
        }
        self.work.cascade_classes(&doomed);
        for param in self.work.params.values_mut() {
            if param.unit_id == Some(id) {
                param.unit_id = None;
            }
        }
        Ok(true)
    }

    async fn find_value_type_by_name(&mut self, name: &str) -> StoreResult<Option<ValueType>> {
        Ok(self.work.value_types.values().find(|v| v.name == name).cloned())
    }

    async fn get_value_type(&mut self, id: ValueTypeId) -> StoreResult<Option<ValueType>> {
        Ok(self.work.value_types.get(&id).cloned())
    }

    async fn insert_value_type(&mut self, name: &str) -> StoreResult<ValueTypeId> {
        check_name("value_types", name)?;
        if self.work.value_types.values().any(|v| v.name == name) {
            return Err(duplicate("value type", name));
        }
        let id = ValueTypeId::new(next(&mut self.work.serials.value_type));
        self.work.value_types.insert(
            id,
            ValueType {
                id,
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    async fn list_value_types(&mut self, name: Option<&str>) -> StoreResult<Vec<ValueType>> {
        Ok(self
            .work
            .value_types
            .values()
            .filter(|v| name.is_none_or(|n| v.name == n))
            .cloned()
            .collect())
    }

    async fn delete_value_type(&mut self, id: ValueTypeId) -> StoreResult<bool> {
        if self.work.value_types.remove(&id).is_none() {
            return Ok(false);
        }
        let params: BTreeSet<ParamId> = self
            .work
            .params
            .values()
            .filter(|p| p.value_type_id == id)
            .map(|p| p.id)
            .collect();
        self.work.cascade_params(&params);
        Ok(true)
    }

    async fn find_param_by_name(&mut self, name: &str) -> StoreResult<Option<ParamRow>> {
        Ok(self.work.params.values().find(|p| p.name == name).cloned())
    }

    async fn get_param(&mut self, id: ParamId) -> StoreResult<Option<ParamRow>> {
        Ok(self.work.params.get(&id).cloned())
    }

    async fn insert_param(
        &mut self,
        name: &str,
        value_type: ValueTypeId,
        unit: UnitId,
    ) -> StoreResult<ParamId> {
        check_name("params", name)?;
        if self.work.params.values().any(|p| p.name == name) {
            return Err(duplicate("param", name));
        }
        if !self.work.value_types.contains_key(&value_type) {
            return Err(missing("value type", value_type));
        }
        if !self.work.units.contains_key(&unit) {
            return Err(missing("organizational unit", unit));
        }
        let id = ParamId::new(next(&mut self.work.serials.param));
        self.work.params.insert(
            id,
            ParamRow {
                id,
                name: name.to_string(),
                value_type_id: value_type,
                unit_id: Some(unit),
            },
        );
        Ok(id)
    }

    async fn list_params(&mut self, name: Option<&str>) -> StoreResult<Vec<ParamRow>> {
        Ok(self
            .work
            .params
            .values()
            .filter(|p| name.is_none_or(|n| p.name == n))
            .cloned()
            .collect())
    }

    async fn insert_class(
        &mut self,
        name: &str,
        parent: Option<ClassId>,
        unit: UnitId,
    ) -> StoreResult<ClassId> {
        check_name("classes", name)?;
        if self.work.classes.values().any(|c| c.name == name) {
            return Err(duplicate("class", name));
        }
        if let Some(parent) = parent {
            if !self.work.classes.contains_key(&parent) {
                return Err(missing("parent class", parent));
            }
        }
        if !self.work.units.contains_key(&unit) {
            return Err(missing("organizational unit", unit));
        }
        let id = ClassId::new(next(&mut self.work.serials.class));
        self.work.classes.insert(
            id,
            ClassRow {
                id,
                name: name.to_string(),
                parent,
                unit_id: unit,
            },
        );
        Ok(id)
    }

    async fn get_class(&mut self, id: ClassId) -> StoreResult<Option<ClassRow>> {
        Ok(self.work.classes.get(&id).cloned())
    }

    async fn find_class_by_name(&mut self, name: &str) -> StoreResult<Option<ClassRow>> {
        Ok(self.work.classes.values().find(|c| c.name == name).cloned())
    }

    async fn list_classes(&mut self) -> StoreResult<Vec<ClassRow>> {
        Ok(self.work.classes.values().cloned().collect())
    }

    async fn children_of(&mut self, id: ClassId) -> StoreResult<Vec<ClassRow>> {
        Ok(self
            .work
            .classes
            .values()
            .filter(|c| c.parent == Some(id))
            .cloned()
            .collect())
    }

    async fn delete_class(&mut self, id: ClassId) -> StoreResult<bool> {
        if !self.work.classes.contains_key(&id) {
            return Ok(false);
        }
        let doomed = self.work.descendants_of(id);
        self.work.cascade_classes(&doomed);
        Ok(true)
    }

    async fn insert_class_param(
        &mut self,
        class: ClassId,
        param: ParamId,
    ) -> StoreResult<ClassParamId> {
        if !self.work.classes.contains_key(&class) {
            return Err(missing("class", class));
        }
        if !self.work.params.contains_key(&param) {
            return Err(missing("param", param));
        }
        if self
            .work
            .class_params
            .values()
            .any(|cp| cp.class_id == class && cp.param_id == param)
        {
            return Err(StoreError::Conflict(format!(
                "param {param} is already declared by class {class}"
            )));
        }
        let id = ClassParamId::new(next(&mut self.work.serials.class_param));
        self.work.class_params.insert(
            id,
            ClassParamRow {
                id,
                class_id: class,
                param_id: param,
            },
        );
        Ok(id)
    }

    async fn class_params_of(&mut self, classes: &[ClassId]) -> StoreResult<Vec<ClassParamRow>> {
        Ok(self
            .work
            .class_params
            .values()
            .filter(|cp| classes.contains(&cp.class_id))
            .copied()
            .collect())
    }

    async fn get_class_param(&mut self, id: ClassParamId) -> StoreResult<Option<ClassParamRow>> {
        Ok(self.work.class_params.get(&id).copied())
    }

    async fn insert_product(&mut self, name: &str, class: ClassId) -> StoreResult<ProductId> {
        check_name("products", name)?;
        if self.work.products.values().any(|p| p.name == name) {
            return Err(duplicate("product", name));
        }
        if !self.work.classes.contains_key(&class) {
            return Err(missing("class", class));
        }
        let id = ProductId::new(next(&mut self.work.serials.product));
        self.work.products.insert(
            id,
            ProductRow {
                id,
                name: name.to_string(),
                class_id: class,
            },
        );
        Ok(id)
    }

    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<ProductRow>> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn find_product_by_name(&mut self, name: &str) -> StoreResult<Option<ProductRow>> {
        Ok(self.work.products.values().find(|p| p.name == name).cloned())
    }

    async fn products_of_class(&mut self, class: ClassId) -> StoreResult<Vec<ProductId>> {
        Ok(self
            .work
            .products
            .values()
            .filter(|p| p.class_id == class)
            .map(|p| p.id)
            .collect())
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<bool> {
        if !self.work.products.contains_key(&id) {
            return Ok(false);
        }
        self.work.cascade_products(&BTreeSet::from([id]));
        Ok(true)
    }

    async fn insert_product_value(
        &mut self,
        product: ProductId,
        class_param: ClassParamId,
        value: &str,
    ) -> StoreResult<()> {
        if !self.work.products.contains_key(&product) {
            return Err(missing("product", product));
        }
        if !self.work.class_params.contains_key(&class_param) {
            return Err(missing("class param", class_param));
        }
        if self
            .work
            .values
            .iter()
            .any(|v| v.product_id == product && v.class_param_id == class_param)
        {
            return Err(StoreError::Conflict(format!(
                "product {product} already has a value for class param {class_param}"
            )));
        }
        self.work.values.push(ProductValueRow {
            product_id: product,
            class_param_id: class_param,
            value: value.to_string(),
        });
        Ok(())
    }

    async fn product_values_of(&mut self, product: ProductId) -> StoreResult<Vec<ProductValueRow>> {
        let mut rows: Vec<ProductValueRow> = self
            .work
            .values
            .iter()
            .filter(|v| v.product_id == product)
            .cloned()
            .collect();
        rows.sort_by_key(|v| v.class_param_id);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(store: &InMemoryCatalogStore) -> (UnitId, ClassId, ClassId, ClassId) {
        let mut tx = store.begin().await.unwrap();
        let unit = tx.insert_unit("U1", "u").await.unwrap();
        let root = tx.insert_class("Vehicle", None, unit).await.unwrap();
        let car = tx.insert_class("Car", Some(root), unit).await.unwrap();
        let sedan = tx.insert_class("Sedan", Some(car), unit).await.unwrap();
        tx.commit().await.unwrap();
        (unit, root, car, sedan)
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_unit("U1", "u").await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_units(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryCatalogStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_value_type("string").await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_value_type_by_name("string").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_and_foreign_keys_are_enforced() {
        let store = InMemoryCatalogStore::new();
        let (unit, _, _, _) = seeded(&store).await;
        let mut tx = store.begin().await.unwrap();

        assert!(matches!(
            tx.insert_class("Car", None, unit).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            tx.insert_class("Boat", Some(ClassId::new(99)), unit).await,
            Err(StoreError::MissingReference(_))
        ));
        assert!(matches!(
            tx.insert_unit("", "x").await,
            Err(StoreError::CheckViolation(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_class_cascades_down_the_subtree() {
        let store = InMemoryCatalogStore::new();
        let (unit, root, car, sedan) = seeded(&store).await;
        let mut tx = store.begin().await.unwrap();
        let vt = tx.insert_value_type("string").await.unwrap();
        let color = tx.insert_param("color", vt, unit).await.unwrap();
        let root_color = tx.insert_class_param(root, color).await.unwrap();
        let sedan_color = tx.insert_class_param(sedan, color).await.unwrap();
        let product = tx.insert_product("Civic", sedan).await.unwrap();
        tx.insert_product_value(product, root_color, "red").await.unwrap();

        assert!(tx.delete_class(car).await.unwrap());
        assert!(tx.get_class(sedan).await.unwrap().is_none());
        assert!(tx.get_class(root).await.unwrap().is_some());
        assert!(tx.get_class_param(sedan_color).await.unwrap().is_none());
        assert!(tx.get_class_param(root_color).await.unwrap().is_some());
        assert!(tx.get_product(product).await.unwrap().is_none());
        assert!(tx.product_values_of(product).await.unwrap().is_empty());
        assert!(!tx.delete_class(car).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_unit_removes_its_classes_and_unassigns_params() {
        let store = InMemoryCatalogStore::new();
        let (unit, root, _, sedan) = seeded(&store).await;
        let mut tx = store.begin().await.unwrap();
        let other = tx.insert_unit("U2", "v").await.unwrap();
        let food = tx.insert_class("Food", None, other).await.unwrap();
        let vt = tx.insert_value_type("string").await.unwrap();
        let color = tx.insert_param("color", vt, unit).await.unwrap();

        assert!(tx.delete_unit(unit).await.unwrap());
        assert!(tx.get_class(root).await.unwrap().is_none());
        assert!(tx.get_class(sedan).await.unwrap().is_none());
        assert!(tx.get_class(food).await.unwrap().is_some());
        assert_eq!(tx.get_param(color).await.unwrap().unwrap().unit_id, None);
    }

    #[tokio::test]
    async fn deleting_a_value_type_removes_its_params() {
        let store = InMemoryCatalogStore::new();
        let (unit, root, _, _) = seeded(&store).await;
        let mut tx = store.begin().await.unwrap();
        let vt = tx.insert_value_type("int").await.unwrap();
        let doors = tx.insert_param("doors", vt, unit).await.unwrap();
        let cp = tx.insert_class_param(root, doors).await.unwrap();

        assert!(tx.delete_value_type(vt).await.unwrap());
        assert!(tx.get_param(doors).await.unwrap().is_none());
        assert!(tx.get_class_param(cp).await.unwrap().is_none());
    }
}
