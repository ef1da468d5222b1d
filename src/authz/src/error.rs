//! Error types for the permission engine

use thiserror::Error;

/// Role catalog problems detected while building a [`RoleRegistry`](crate::RoleRegistry).
///
/// Every variant is fatal: a catalog that fails validation never reaches
/// the request path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Inheritance cycle, rendered as `a -> b -> a`
    #[error("Circular role inheritance: {0}")]
    CircularInheritance(String),

    /// A role inherits from a role the catalog does not define
    #[error("Role '{role}' inherits from undefined role '{parent}'")]
    UndefinedParent { role: String, parent: String },

    /// Two definitions share an id
    #[error("Duplicate role id: {0}")]
    DuplicateRole(String),

    /// Structurally invalid role definition
    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

/// Permission engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Catalog validation failure (fatal at load time)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Role id not present in the catalog
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Malformed condition operator or comparison value
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Bad engine configuration value (environment overrides)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catalog document could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// Whether the error must abort startup rather than degrade to a deny
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnknownRole(_) | Self::InvalidCondition(_))
    }
}

/// Result type for permission engine operations
pub type Result<T> = std::result::Result<T, AuthzError>;
