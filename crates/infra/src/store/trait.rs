use std::sync::Arc;

use thiserror::Error;

use taxonomy_core::{
    CatalogError, ClassId, ClassParamId, ClassParamRow, ClassRow, OrganizationalUnit, ParamId,
    ParamRow, ProductId, ProductRow, ProductValueRow, UnitId, ValueType, ValueTypeId,
};

/// Storage operation error.
///
/// These are **infrastructure errors** reported by the backend's constraints,
/// as opposed to the catalog's own validation. Each maps onto one
/// `CatalogError` category.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// A foreign key pointed at a row that does not exist.
    #[error("missing referenced row: {0}")]
    MissingReference(String),

    /// A check / not-null constraint rejected the write.
    #[error("check constraint violated: {0}")]
    CheckViolation(String),

    /// Connection, transaction or decoding failure.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => CatalogError::Conflict(msg),
            StoreError::MissingReference(msg) => CatalogError::NotFound(msg),
            StoreError::CheckViolation(msg) => CatalogError::Validation(msg),
            StoreError::Backend(msg) => CatalogError::Storage(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional record store holding the catalog relations.
///
/// `begin` opens one unit of work. Nothing written through the returned
/// transaction is visible to other transactions until `commit`; `rollback`
/// (or dropping the transaction) discards every write.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    type Tx: CatalogTx;

    async fn begin(&self) -> StoreResult<Self::Tx>;
}

#[async_trait::async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    type Tx = S::Tx;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        (**self).begin().await
    }
}

/// Row-level primitives available inside one transaction.
///
/// Implementations own uniqueness (names, `(class, param)`,
/// `(product, class param)`) and on-delete rules:
///
/// - deleting a class removes its descendants, their class params, the
///   products attached to any of them and every value referencing either;
/// - deleting a product removes its values;
/// - deleting a value type removes the params of that type (and, through
///   them, class params and values);
/// - deleting an organizational unit removes the classes it owns (cascading
///   as above) and leaves the params it owned unassigned.
///
/// Listing methods return rows in id order.
#[async_trait::async_trait]
pub trait CatalogTx: Send + Sized {
    async fn commit(self) -> StoreResult<()>;
    async fn rollback(self) -> StoreResult<()>;

    // Organizational units
    async fn find_unit_by_name(&mut self, name: &str) -> StoreResult<Option<OrganizationalUnit>>;
    async fn get_unit(&mut self, id: UnitId) -> StoreResult<Option<OrganizationalUnit>>;
    async fn insert_unit(&mut self, name: &str, short_name: &str) -> StoreResult<UnitId>;
    async fn list_units(&mut self, name: Option<&str>) -> StoreResult<Vec<OrganizationalUnit>>;
    async fn delete_unit(&mut self, id: UnitId) -> StoreResult<bool>;

    // Value types
    async fn find_value_type_by_name(&mut self, name: &str) -> StoreResult<Option<ValueType>>;
    async fn get_value_type(&mut self, id: ValueTypeId) -> StoreResult<Option<ValueType>>;
    async fn insert_value_type(&mut self, name: &str) -> StoreResult<ValueTypeId>;
    async fn list_value_types(&mut self, name: Option<&str>) -> StoreResult<Vec<ValueType>>;
    async fn delete_value_type(&mut self, id: ValueTypeId) -> StoreResult<bool>;

    // Params
    async fn find_param_by_name(&mut self, name: &str) -> StoreResult<Option<ParamRow>>;
    async fn get_param(&mut self, id: ParamId) -> StoreResult<Option<ParamRow>>;
    async fn insert_param(
        &mut self,
        name: &str,
        value_type: ValueTypeId,
        unit: UnitId,
    ) -> StoreResult<ParamId>;
    async fn list_params(&mut self, name: Option<&str>) -> StoreResult<Vec<ParamRow>>;

    // Classes
    async fn insert_class(
        &mut self,
        name: &str,
        parent: Option<ClassId>,
        unit: UnitId,
    ) -> StoreResult<ClassId>;
    async fn get_class(&mut self, id: ClassId) -> StoreResult<Option<ClassRow>>;
    async fn find_class_by_name(&mut self, name: &str) -> StoreResult<Option<ClassRow>>;
    async fn list_classes(&mut self) -> StoreResult<Vec<ClassRow>>;
    async fn children_of(&mut self, id: ClassId) -> StoreResult<Vec<ClassRow>>;
    async fn delete_class(&mut self, id: ClassId) -> StoreResult<bool>;

    // Class params
    async fn insert_class_param(
        &mut self,
        class: ClassId,
        param: ParamId,
    ) -> StoreResult<ClassParamId>;
    async fn class_params_of(&mut self, classes: &[ClassId]) -> StoreResult<Vec<ClassParamRow>>;
    async fn get_class_param(&mut self, id: ClassParamId) -> StoreResult<Option<ClassParamRow>>;

    // Products
    async fn insert_product(&mut self, name: &str, class: ClassId) -> StoreResult<ProductId>;
    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<ProductRow>>;
    async fn find_product_by_name(&mut self, name: &str) -> StoreResult<Option<ProductRow>>;
    async fn products_of_class(&mut self, class: ClassId) -> StoreResult<Vec<ProductId>>;
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<bool>;

    // Product values
    async fn insert_product_value(
        &mut self,
        product: ProductId,
        class_param: ClassParamId,
        value: &str,
    ) -> StoreResult<()>;
    async fn product_values_of(&mut self, product: ProductId) -> StoreResult<Vec<ProductValueRow>>;
}
