//! Core authorization types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique role identifier
pub type RoleId = String;

/// Operation verb (create, read, update, ...)
///
/// The set of verbs is open: catalogs may name any action. The common ones
/// are available as constructors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// Verbs every deployment understands
    pub const STANDARD: [&'static str; 7] = [
        "create", "read", "update", "delete", "approve", "publish", "export",
    ];

    /// Create a new action
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn create() -> Self {
        Self::new("create")
    }

    pub fn read() -> Self {
        Self::new("read")
    }

    pub fn update() -> Self {
        Self::new("update")
    }

    pub fn delete() -> Self {
        Self::new("delete")
    }

    pub fn approve() -> Self {
        Self::new("approve")
    }

    pub fn publish() -> Self {
        Self::new("publish")
    }

    pub fn export() -> Self {
        Self::new("export")
    }

    /// All standard verbs as a set
    pub fn standard() -> BTreeSet<Action> {
        Self::STANDARD.iter().map(|name| Action::new(*name)).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Caller identity as seen by the engine
///
/// Authentication happens elsewhere; the engine only needs the user id for
/// the audit trail and the assigned role for evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier (e.g., "user:alice@example.com")
    pub id: String,

    /// Assigned role id
    pub role: RoleId,
}

impl User {
    /// Create a new user with the given role
    pub fn new(id: impl Into<String>, role: impl Into<RoleId>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }
}
