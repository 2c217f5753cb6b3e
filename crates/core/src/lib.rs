//! `taxonomy-core`: catalog foundation types.
//!
//! Identifiers, the error taxonomy and the data model shared by the hierarchy,
//! product and infrastructure crates. No IO.

pub mod error;
pub mod id;
pub mod model;

pub use error::{CatalogError, CatalogResult, ensure_name};
pub use id::{ClassId, ClassParamId, ParamId, ProductId, UnitId, ValueTypeId};
pub use model::{
    Class, ClassParam, ClassParamRow, ClassRow, ClassTree, NewClass, NewParam, NewProduct,
    NewUnit, NewValue, OrganizationalUnit, Param, ParamRow, Product, ProductRow, ProductValue,
    ProductValueRow, ValueType,
};
