//! Role catalog record types

use crate::context::ContextValue;
use crate::error::ConfigError;
use crate::types::{Action, RoleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Comparison operator of a [`Condition`]
///
/// Operator names that are not recognised are kept as [`Operator::Unknown`]
/// instead of failing catalog deserialization; they evaluate to a denial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    Contains,
    In,
    GreaterThan,
    LessThan,
    StartsWith,
    EndsWith,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::In => "in",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Unknown(name) => name,
        }
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "equals" => Self::Equals,
            "contains" => Self::Contains,
            "in" => Self::In,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            _ => Self::Unknown(name),
        }
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over the request context narrowing when a permission applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-path into the context (e.g., "user.role")
    pub field: String,

    pub operator: Operator,

    /// Comparison value
    pub value: ContextValue,

    /// Optional human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Condition {
    /// Create a new condition
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<ContextValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Allowed actions on a resource pattern, optionally conditional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePermission {
    /// Resource pattern; a trailing `*` makes it a prefix wildcard
    pub resource: String,

    pub actions: BTreeSet<Action>,

    /// AND-combined conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Other resource names this entry also covers
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub aliases: BTreeSet<String>,
}

impl ResourcePermission {
    /// Create an unconditional permission
    pub fn new<I, A>(resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action>,
    {
        Self {
            resource: resource.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            conditions: Vec::new(),
            aliases: BTreeSet::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    /// Whether `action` is in the allowed set
    pub fn allows(&self, action: &Action) -> bool {
        self.actions.contains(action)
    }

    /// Literal prefix of a wildcard pattern (`"billing.*"` → `"billing."`)
    pub fn wildcard_prefix(&self) -> Option<&str> {
        self.resource.strip_suffix('*')
    }
}

/// Named bundle of permissions assignable to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Unique role id (e.g., "editor")
    pub id: RoleId,

    /// Human-readable name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared permissions, in order
    #[serde(default)]
    pub permissions: Vec<ResourcePermission>,

    /// Parent role ids whose permissions this role inherits
    #[serde(default, alias = "inherits_from", skip_serializing_if = "Vec::is_empty")]
    pub inherits_from: Vec<RoleId>,

    /// Grants every action on every resource without evaluation
    #[serde(default, alias = "bypass_all")]
    pub bypass_all: bool,
}

impl Role {
    /// Create a role with no permissions
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            permissions: Vec::new(),
            inherits_from: Vec::new(),
            bypass_all: false,
        }
    }

    pub fn with_permission(mut self, permission: ResourcePermission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn inherits(mut self, parent: impl Into<RoleId>) -> Self {
        self.inherits_from.push(parent.into());
        self
    }

    pub fn with_bypass_all(mut self) -> Self {
        self.bypass_all = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Structural checks that need no other role
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::InvalidRole("Role id cannot be empty".to_string()));
        }

        for parent in &self.inherits_from {
            if parent == &self.id {
                return Err(ConfigError::CircularInheritance(format!(
                    "{} -> {}",
                    self.id, self.id
                )));
            }
        }

        for permission in &self.permissions {
            if permission.resource.is_empty() {
                return Err(ConfigError::InvalidRole(format!(
                    "Role '{}' has a permission with an empty resource pattern",
                    self.id
                )));
            }
        }

        Ok(())
    }
}
