//! Role catalog
//!
//! The registry is built once at startup and is read-only afterwards, so it
//! can be shared behind an `Arc` and read from any thread without locking.
//! Every structural problem (cycles, dangling parents, duplicates) is a
//! [`ConfigError`] raised here, never on the request path.
//!
//! # Example
//!
//! ```rust
//! use console_authz::registry::{ResourcePermission, Role, RoleRegistry};
//!
//! let registry = RoleRegistry::new(vec![
//!     Role::new("editor", "Editor")
//!         .with_permission(ResourcePermission::new("content", ["read", "update"])),
//!     Role::new("teamLead", "Team Lead")
//!         .inherits("editor")
//!         .with_permission(ResourcePermission::new("content", ["publish"])),
//! ])?;
//!
//! assert!(registry.get_definition("teamLead").is_ok());
//! # Ok::<(), console_authz::AuthzError>(())
//! ```

pub mod graph;
pub mod types;

pub use graph::InheritanceGraph;
pub use types::{Condition, Operator, ResourcePermission, Role};

use crate::error::{AuthzError, Result};
use crate::types::Action;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

/// Accepted catalog document shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Wrapped { roles: Vec<Role> },
    Bare(Vec<Role>),
}

/// Immutable, validated catalog of role definitions
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    /// Definitions in catalog order
    roles: Vec<Role>,

    /// role id -> index into `roles`
    index: HashMap<String, usize>,

    /// Parents-before-children ordering
    order: Vec<String>,
}

impl RoleRegistry {
    /// Validate and index a catalog
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Config`] for an invalid role, a duplicate id,
    /// an undefined parent or an inheritance cycle.
    pub fn new(roles: Vec<Role>) -> Result<Self> {
        for role in &roles {
            role.validate()?;
        }

        let graph = InheritanceGraph::build(&roles)?;
        let order = graph.topological_order()?;

        let index = roles
            .iter()
            .enumerate()
            .map(|(i, role)| (role.id.clone(), i))
            .collect();

        info!("Role catalog loaded: {} roles", roles.len());

        Ok(Self { roles, index, order })
    }

    /// Parse a JSON catalog, either `{"roles": [...]}` or a bare array
    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        let roles = match document {
            CatalogDocument::Wrapped { roles } | CatalogDocument::Bare(roles) => roles,
        };
        Self::new(roles)
    }

    /// Read and parse a JSON catalog file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Look up a role definition
    pub fn get_definition(&self, role_id: &str) -> Result<&Role> {
        self.index
            .get(role_id)
            .map(|&i| &self.roles[i])
            .ok_or_else(|| AuthzError::UnknownRole(role_id.to_string()))
    }

    pub fn contains(&self, role_id: &str) -> bool {
        self.index.contains_key(role_id)
    }

    /// All definitions, in catalog order
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Role ids with every parent listed before its children
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Every action named anywhere in the catalog
    pub fn declared_actions(&self) -> BTreeSet<Action> {
        self.roles
            .iter()
            .flat_map(|role| role.permissions.iter())
            .flat_map(|permission| permission.actions.iter().cloned())
            .collect()
    }
}
