//! # Console Authorization Engine
//!
//! Role-based permission evaluation for an administrative console.
//!
//! ## Features
//!
//! - **Role catalog** validated once at startup (cycles, dangling parents, duplicates)
//! - **Role inheritance** with parents-first permission merging
//! - **Resource matching** by exact name, `prefix.*` wildcard or alias
//! - **Attribute conditions** over a per-call context (`equals`, `in`, `greater_than`, ...)
//! - **Decision cache** keyed by BLAKE3 digest with TTL expiry
//! - **Audit trail** ring buffer with a broadcast subscription
//! - **Fail-closed**: unknown roles, resources and malformed conditions deny
//!
//! ## Example
//!
//! ```rust
//! use console_authz::{
//!     Action, Condition, EngineConfig, PermissionContext, PermissionEngine,
//!     ResourcePermission, Role, User,
//! };
//!
//! let engine = PermissionEngine::from_roles(
//!     vec![Role::new("supportAgent", "Support Agent").with_permission(
//!         ResourcePermission::new("tickets", ["read", "update"])
//!             .with_condition(Condition::new("ticket.status", "in", vec!["open", "pending"])),
//!     )],
//!     EngineConfig::default(),
//! )?;
//!
//! let agent = User::new("u-42", "supportAgent");
//! let open = PermissionContext::new().with("ticket", PermissionContext::new().with("status", "open"));
//!
//! assert!(engine.check(&agent, "tickets", &Action::update(), Some(&open)));
//! assert!(!engine.check(&agent, "tickets", &Action::delete(), Some(&open)));
//! # Ok::<(), console_authz::AuthzError>(())
//! ```

pub mod condition;
pub mod context;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use condition::ConditionEvaluator;
pub use context::{ContextValue, PermissionContext};
pub use engine::{
    AuditQuery, AuditRecord, AuditTrail, CacheStats, CheckRequest, Decision, DecisionSource,
    EngineConfig, EngineMetrics, PermissionCache, PermissionEngine,
};
pub use error::{AuthzError, ConfigError, Result};
pub use matcher::ResourceMatcher;
pub use registry::{Condition, Operator, ResourcePermission, Role, RoleRegistry};
pub use resolver::{EffectivePermissions, PermissionResolver};
pub use types::{Action, RoleId, User};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
