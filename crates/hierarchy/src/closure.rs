//! Attribute resolution: the set of class params visible to a class.
//!
//! A class sees its own params plus those of every ancestor. Identity of an
//! inherited attribute is the declaring `(class, param)` pair, so the same
//! param declared at two levels appears twice.

use std::collections::{HashMap, HashSet};

use taxonomy_core::{CatalogError, CatalogResult, ClassId, ClassParam};

/// Walk from a class towards the root, one parent link at a time.
///
/// The caller fetches each parent (usually from storage) and feeds it back
/// with [`AncestorWalk::climb`]; "no parent" terminates the walk.
#[derive(Debug, Clone)]
pub struct AncestorWalk {
    chain: Vec<ClassId>,
    seen: HashSet<ClassId>,
}

impl AncestorWalk {
    pub fn start(class_id: ClassId) -> Self {
        Self {
            chain: vec![class_id],
            seen: HashSet::from([class_id]),
        }
    }

    /// The class whose parent must be looked up next.
    pub fn current(&self) -> ClassId {
        self.chain[self.chain.len() - 1]
    }

    /// Record `parent` as the parent of [`Self::current`].
    ///
    /// Revisiting a class means the parent relation has a cycle.
    pub fn climb(&mut self, parent: ClassId) -> CatalogResult<()> {
        if !self.seen.insert(parent) {
            return Err(CatalogError::internal(format!(
                "class {} appears twice in its own ancestor chain",
                parent
            )));
        }
        self.chain.push(parent);
        Ok(())
    }

    /// Classes from the root down to the starting class.
    pub fn root_first(self) -> Vec<ClassId> {
        let mut chain = self.chain;
        chain.reverse();
        chain
    }
}

/// Order class params ancestor-first.
///
/// `chain` lists classes root first (see [`AncestorWalk::root_first`]).
/// Params declared by classes outside the chain are dropped. Within one class,
/// params keep declaration order (class-param id).
pub fn attribute_closure(chain: &[ClassId], declared: Vec<ClassParam>) -> Vec<ClassParam> {
    let depth: HashMap<ClassId, usize> = chain.iter().enumerate().map(|(i, c)| (*c, i)).collect();

    let mut visible: Vec<(usize, ClassParam)> = declared
        .into_iter()
        .filter_map(|cp| depth.get(&cp.class_id).map(|d| (*d, cp)))
        .collect();
    visible.sort_by_key(|(d, cp)| (*d, cp.id));
    visible.into_iter().map(|(_, cp)| cp).collect()
}
