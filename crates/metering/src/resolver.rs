//! Maps a request's child id to the quota account it draws from.
//!
//! Children on a family plan share one pooled account; everyone else meters
//! against their own.  Keeping the mapping here is what lets the admission
//! controller stay agnostic to pooling.

use std::collections::HashMap;

use tm_domain::{AccountRef, ChildId, FamilyId};

/// Child → family-pool membership.
#[derive(Debug, Clone, Default)]
pub struct PoolResolver {
    families: HashMap<ChildId, FamilyId>,
}

impl PoolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a child on a shared family pool.
    pub fn assign(&mut self, child: ChildId, family: FamilyId) {
        self.families.insert(child, family);
    }

    /// Take a child off its family pool; subsequent requests meter against
    /// the child's own account.
    pub fn remove(&mut self, child: &ChildId) -> Option<FamilyId> {
        self.families.remove(child)
    }

    /// The account a child's consumption is charged to.
    pub fn resolve(&self, child: &ChildId) -> AccountRef {
        match self.families.get(child) {
            Some(family) => AccountRef::Family(family.clone()),
            None => AccountRef::Child(child.clone()),
        }
    }
}
