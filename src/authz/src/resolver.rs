//! Effective permission resolution
//!
//! Flattens a role's `inherits_from` chain into one ordered permission list.
//! Entries are merged by resource pattern:
//!
//! - `actions`: set union of own and inherited entries
//! - `conditions`: own conditions followed by inherited ones (AND)
//! - `aliases`: set union
//!
//! The catalog never mutates in place, so results are memoized per role id
//! for the lifetime of the resolver.

use crate::registry::{ResourcePermission, RoleRegistry};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Inheritance-resolved permission list
pub type EffectivePermissions = Arc<[ResourcePermission]>;

/// Computes and memoizes effective permissions per role
pub struct PermissionResolver {
    registry: Arc<RoleRegistry>,

    /// role id -> resolved permissions
    memo: DashMap<String, EffectivePermissions>,
}

impl PermissionResolver {
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self {
            registry,
            memo: DashMap::new(),
        }
    }

    /// Effective permissions of `role_id`
    ///
    /// An unknown role resolves to an empty list.
    pub fn effective_permissions(&self, role_id: &str) -> EffectivePermissions {
        if let Some(cached) = self.memo.get(role_id) {
            return cached.value().clone();
        }

        let resolved: EffectivePermissions = self.resolve_uncached(role_id).into();
        debug!("Resolved {} effective permissions for role '{}'", resolved.len(), role_id);

        // A concurrent resolver may have won the race; both results are identical.
        self.memo
            .entry(role_id.to_string())
            .or_insert(resolved)
            .value()
            .clone()
    }

    /// Number of memoized roles
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    fn resolve_uncached(&self, role_id: &str) -> Vec<ResourcePermission> {
        if !self.registry.contains(role_id) {
            return Vec::new();
        }

        let mut merged: Vec<ResourcePermission> = Vec::new();
        let mut by_pattern: HashMap<String, usize> = HashMap::new();

        for ancestor in self.lineage(role_id) {
            let Ok(role) = self.registry.get_definition(ancestor) else {
                continue;
            };

            for permission in &role.permissions {
                match by_pattern.get(&permission.resource) {
                    Some(&i) => {
                        let entry = &mut merged[i];
                        entry.actions.extend(permission.actions.iter().cloned());
                        entry.conditions.extend(permission.conditions.iter().cloned());
                        entry.aliases.extend(permission.aliases.iter().cloned());
                    }
                    None => {
                        by_pattern.insert(permission.resource.clone(), merged.len());
                        merged.push(permission.clone());
                    }
                }
            }
        }

        merged
    }

    /// The role followed by its ancestors in depth-first pre-order
    ///
    /// Each ancestor appears once even when reachable along several paths.
    fn lineage<'a>(&'a self, role_id: &'a str) -> Vec<&'a str> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut lineage = Vec::new();
        let mut stack = vec![role_id];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            lineage.push(current);

            if let Ok(role) = self.registry.get_definition(current) {
                // Reverse so the first declared parent is visited first
                for parent in role.inherits_from.iter().rev() {
                    if !visited.contains(parent.as_str()) {
                        stack.push(parent.as_str());
                    }
                }
            }
        }

        lineage
    }
}
