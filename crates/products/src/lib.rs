//! Products domain module.
//!
//! Rules binding products to the class hierarchy: products attach only to leaf
//! classes, and every supplied value must name an attribute the class inherits.
//! Deterministic logic only (no IO, no storage).

pub mod binding;
pub mod placement;

pub use binding::{BoundValue, bind_values};
pub use placement::{ensure_leaf, validate_product};
