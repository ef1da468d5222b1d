//! Resource pattern matching
//!
//! Picks the permission entry that governs a queried resource. Tiers are
//! tried in order and the first tier with a hit wins:
//!
//! 1. Exact pattern match
//! 2. Prefix wildcard (`"reports.*"`), longest literal prefix first
//! 3. Alias match
//!
//! # Example
//!
//! ```rust
//! use console_authz::matcher::ResourceMatcher;
//! use console_authz::registry::ResourcePermission;
//!
//! let permissions = vec![
//!     ResourcePermission::new("billing.*", ["read"]),
//!     ResourcePermission::new("billing.invoices", ["read", "export"]),
//! ];
//!
//! let hit = ResourceMatcher::find(&permissions, "billing.invoices").unwrap();
//! assert_eq!(hit.resource, "billing.invoices");
//! ```

use crate::registry::ResourcePermission;

/// Stateless resource matcher
pub struct ResourceMatcher;

impl ResourceMatcher {
    /// Find the entry applicable to `resource`
    pub fn find<'a>(
        permissions: &'a [ResourcePermission],
        resource: &str,
    ) -> Option<&'a ResourcePermission> {
        Self::exact(permissions, resource)
            .or_else(|| Self::wildcard(permissions, resource))
            .or_else(|| Self::alias(permissions, resource))
    }

    fn exact<'a>(
        permissions: &'a [ResourcePermission],
        resource: &str,
    ) -> Option<&'a ResourcePermission> {
        permissions.iter().find(|p| p.resource == resource)
    }

    /// Longest matching prefix; on equal length the first declared entry wins
    fn wildcard<'a>(
        permissions: &'a [ResourcePermission],
        resource: &str,
    ) -> Option<&'a ResourcePermission> {
        let mut best: Option<(usize, &'a ResourcePermission)> = None;

        for permission in permissions {
            let Some(prefix) = permission.wildcard_prefix() else {
                continue;
            };
            if !resource.starts_with(prefix) {
                continue;
            }
            if best.map_or(true, |(len, _)| prefix.len() > len) {
                best = Some((prefix.len(), permission));
            }
        }

        best.map(|(_, permission)| permission)
    }

    fn alias<'a>(
        permissions: &'a [ResourcePermission],
        resource: &str,
    ) -> Option<&'a ResourcePermission> {
        permissions.iter().find(|p| p.aliases.contains(resource))
    }
}
