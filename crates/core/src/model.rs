//! Catalog data model: stored entities, flat rows, and submission shapes.

use serde::{Deserialize, Serialize};

use crate::id::{ClassId, ClassParamId, ParamId, ProductId, UnitId, ValueTypeId};

/// Naming/ownership entity attached to classes and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: UnitId,
    pub name: String,
    pub short_name: String,
}

/// Named scalar type a parameter may hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueType {
    pub id: ValueTypeId,
    pub name: String,
}

/// Reusable, typed attribute definition (not bound to a class).
///
/// `owner_unit` is `None` once the owning unit has been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub id: ParamId,
    pub name: String,
    pub value_type: ValueType,
    pub owner_unit: Option<OrganizationalUnit>,
}

/// A param bound to the class that declares it; the unit of inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassParam {
    pub id: ClassParamId,
    /// Class that declared this param (not necessarily the class being read).
    pub class_id: ClassId,
    pub param: Param,
}

/// A single class with its unit and either its own or its inherited params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub parent: Option<ClassId>,
    pub unit: OrganizationalUnit,
    pub params: Vec<ClassParam>,
}

/// A class node with its materialized descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTree {
    pub id: ClassId,
    pub name: String,
    pub parent: Option<ClassId>,
    pub children: Vec<ClassTree>,
}

impl ClassTree {
    pub fn leaf(id: ClassId, name: impl Into<String>, parent: Option<ClassId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this tree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ClassTree::node_count).sum::<usize>()
    }
}

/// One stored value of a product, joined with its declaring class param.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductValue {
    pub class_param: ClassParam,
    pub value: String,
}

/// Concrete instance attached to a leaf class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub class: Class,
    pub values: Vec<ProductValue>,
}

impl Product {
    pub fn value_of(&self, param_name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.class_param.param.name == param_name)
            .map(|v| v.value.as_str())
    }
}

// Flat rows as stored.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRow {
    pub id: ParamId,
    pub name: String,
    pub value_type_id: ValueTypeId,
    pub unit_id: Option<UnitId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRow {
    pub id: ClassId,
    pub name: String,
    pub parent: Option<ClassId>,
    pub unit_id: UnitId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassParamRow {
    pub id: ClassParamId,
    pub class_id: ClassId,
    pub param_id: ParamId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub class_id: ClassId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductValueRow {
    pub product_id: ProductId,
    pub class_param_id: ClassParamId,
    pub value: String,
}

// Submission shapes.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnit {
    pub name: String,
    #[serde(default)]
    pub short_name: String,
}

impl NewUnit {
    pub fn new(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
        }
    }
}

/// Param declaration: resolved by name against value types and units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParam {
    pub name: String,
    pub value_type: String,
    pub unit: String,
}

impl NewParam {
    pub fn new(
        name: impl Into<String>,
        value_type: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.into(),
            unit: unit.into(),
        }
    }
}

/// A class to create together with its whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClass {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub params: Vec<NewParam>,
    #[serde(default)]
    pub children: Vec<NewClass>,
}

impl NewClass {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            params: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: NewParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_child(mut self, child: NewClass) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewValue {
    pub param: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    /// Name of the (leaf) class the product attaches to.
    pub class: String,
    #[serde(default)]
    pub values: Vec<NewValue>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push(NewValue {
            param: param.into(),
            value: value.into(),
        });
        self
    }
}
