//! Permission check requests and decisions

use crate::context::PermissionContext;
use crate::types::Action;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One (resource, action, context) query for batch checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Resource being accessed (e.g., "billing.invoices")
    pub resource: String,

    /// Action being performed
    pub action: Action,

    /// Optional per-call context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PermissionContext>,
}

impl CheckRequest {
    pub fn new(resource: impl Into<String>, action: impl Into<Action>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: PermissionContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Which pipeline stage produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Role carries the bypass-all marker
    Bypass,
    /// Served from the permission cache
    Cache,
    /// Resolved, matched and evaluated
    Evaluated,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bypass => write!(f, "bypass"),
            Self::Cache => write!(f, "cache"),
            Self::Evaluated => write!(f, "evaluated"),
        }
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub granted: bool,

    pub source: DecisionSource,

    /// Operator-facing explanation; never shown to end users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    /// Allow decision
    pub fn allow(source: DecisionSource, reason: impl Into<String>) -> Self {
        Self {
            granted: true,
            source,
            reason: Some(reason.into()),
        }
    }

    /// Deny decision
    pub fn deny(source: DecisionSource, reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            source,
            reason: Some(reason.into()),
        }
    }
}
