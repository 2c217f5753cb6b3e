//! Class hierarchy domain module.
//!
//! Pure tree logic over flat class rows: forest reconstruction, subtree
//! extraction, ancestor walks and attribute closure ordering, and preorder
//! planning of submitted subtrees. Storage access lives in `taxonomy-infra`.

pub mod closure;
pub mod forest;
pub mod plan;

pub use closure::{AncestorWalk, attribute_closure};
pub use forest::{build_forest, build_subtree, isomorphic};
pub use plan::{PlannedClass, plan_subtree};
