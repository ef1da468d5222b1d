//! Permission engine facade
//!
//! Orchestrates role lookup, effective-permission resolution, resource
//! matching and condition evaluation with decision caching, audit logging
//! and metrics. This is the only component clients call.

pub mod audit;
pub mod cache;
pub mod decision;
pub mod metrics;

pub use audit::{AuditConfig, AuditQuery, AuditRecord, AuditStats, AuditTrail};
pub use cache::{CacheConfig, CacheKey, CacheStats, PermissionCache};
pub use decision::{CheckRequest, Decision, DecisionSource};
pub use metrics::{EngineMetrics, MetricsCollector};

use crate::condition::ConditionEvaluator;
use crate::context::PermissionContext;
use crate::error::{AuthzError, Result};
use crate::matcher::ResourceMatcher;
use crate::registry::{Role, RoleRegistry};
use crate::resolver::{EffectivePermissions, PermissionResolver};
use crate::types::{Action, User};

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Audit reason attached to every bypass-all decision
pub const BYPASS_REASON: &str = "bypass-all role";

/// Permission engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Enable decision caching
    pub enable_cache: bool,

    /// Cache configuration
    pub cache_config: CacheConfig,

    /// Audit trail configuration
    pub audit_config: AuditConfig,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_config: CacheConfig::default(),
            audit_config: AuditConfig::default(),
            enable_metrics: true,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by environment variables
    ///
    /// - `AUTHZ_CACHE_ENABLED` - `true`/`false` (default: true)
    /// - `AUTHZ_CACHE_TTL_SECS` - decision TTL in seconds (default: 300)
    /// - `AUTHZ_CACHE_CAPACITY` - maximum cached decisions (default: 10000)
    /// - `AUTHZ_AUDIT_CAPACITY` - audit ring buffer size (default: 1000)
    /// - `AUTHZ_METRICS_ENABLED` - `true`/`false` (default: true)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(enabled) = parse_var(&lookup, "AUTHZ_CACHE_ENABLED", parse_bool)? {
            config.enable_cache = enabled;
        }
        if let Some(secs) = parse_var(&lookup, "AUTHZ_CACHE_TTL_SECS", u64::from_str)? {
            config.cache_config.ttl = Duration::from_secs(secs);
        }
        if let Some(capacity) = parse_var(&lookup, "AUTHZ_CACHE_CAPACITY", usize::from_str)? {
            config.cache_config.capacity = capacity;
        }
        if let Some(capacity) = parse_var(&lookup, "AUTHZ_AUDIT_CAPACITY", usize::from_str)? {
            if capacity == 0 {
                return Err(AuthzError::InvalidConfig(
                    "AUTHZ_AUDIT_CAPACITY must be at least 1".to_string(),
                ));
            }
            config.audit_config.capacity = capacity;
        }
        if let Some(enabled) = parse_var(&lookup, "AUTHZ_METRICS_ENABLED", parse_bool)? {
            config.enable_metrics = enabled;
        }

        Ok(config)
    }

    /// Configuration with caching turned off
    pub fn without_cache() -> Self {
        Self {
            enable_cache: false,
            ..Self::default()
        }
    }
}

fn parse_var<T, E: std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> std::result::Result<T, E>,
) -> Result<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => parse(raw.trim())
            .map(Some)
            .map_err(|e| AuthzError::InvalidConfig(format!("{}={:?}: {}", name, raw, e))),
    }
}

fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got '{}'", other)),
    }
}

/// Result of the uncached pipeline
struct Evaluation {
    decision: Decision,

    /// False for denials caused by malformed conditions
    cacheable: bool,
}

impl Evaluation {
    fn reusable(decision: Decision) -> Self {
        Self {
            decision,
            cacheable: true,
        }
    }
}

/// Role-based permission engine
///
/// # Architecture
///
/// ```text
/// check → RoleRegistry → [bypass?] → PermissionCache → PermissionResolver
///                                         ↓                  ↓
///                                         ↓           ResourceMatcher → ConditionEvaluator
///                                         ↓                                     ↓
///                                    AuditTrail ←──────────── Decision ←────────┘
/// ```
///
/// `check()` never performs I/O, never awaits and never fails: every
/// runtime fault resolves to a deny with the reason kept in the audit trail.
pub struct PermissionEngine {
    registry: Arc<RoleRegistry>,

    resolver: PermissionResolver,

    /// Decision cache (absent when disabled)
    cache: Option<PermissionCache>,

    audit: AuditTrail,

    metrics: Option<MetricsCollector>,

    config: EngineConfig,
}

impl PermissionEngine {
    /// Create an engine over a validated catalog
    pub fn new(registry: impl Into<Arc<RoleRegistry>>, config: EngineConfig) -> Self {
        let registry = registry.into();
        let resolver = PermissionResolver::new(Arc::clone(&registry));

        let cache = config
            .enable_cache
            .then(|| PermissionCache::new(config.cache_config.clone()));
        let metrics = config.enable_metrics.then(MetricsCollector::new);
        let audit = AuditTrail::new(config.audit_config.clone());

        info!(
            "PermissionEngine initialized with roles={}, cache={}, metrics={}, audit_capacity={}",
            registry.len(),
            config.enable_cache,
            config.enable_metrics,
            audit.capacity()
        );

        Self {
            registry,
            resolver,
            cache,
            audit,
            metrics,
            config,
        }
    }

    /// Validate `roles` and build an engine over them
    pub fn from_roles(roles: Vec<Role>, config: EngineConfig) -> Result<Self> {
        Ok(Self::new(RoleRegistry::new(roles)?, config))
    }

    /// Whether `user` may perform `action` on `resource`
    pub fn check(
        &self,
        user: &User,
        resource: &str,
        action: &Action,
        context: Option<&PermissionContext>,
    ) -> bool {
        self.check_decision(user, resource, action, context).granted
    }

    /// Like [`PermissionEngine::check`], returning the full decision
    ///
    /// Emits exactly one audit record.
    pub fn check_decision(
        &self,
        user: &User,
        resource: &str,
        action: &Action,
        context: Option<&PermissionContext>,
    ) -> Decision {
        let start = Instant::now();

        debug!(
            "Permission check: user={}, role={}, resource={}, action={}",
            user.id, user.role, resource, action
        );

        let decision = self.decide(user, resource, action, context);

        if let Some(metrics) = &self.metrics {
            metrics.record_decision(decision.granted, decision.source, start.elapsed());
        }

        self.audit
            .record(AuditRecord::new(user, resource, action, context, &decision));

        decision
    }

    /// Check every request for `user`; results are in request order
    pub fn check_all(&self, user: &User, requests: &[CheckRequest]) -> Vec<bool> {
        if self.is_bypass(user) {
            debug!("Batch of {} checks short-circuited by bypass-all role", requests.len());
        }

        requests
            .iter()
            .map(|request| {
                self.check(user, &request.resource, &request.action, request.context.as_ref())
            })
            .collect()
    }

    /// True when at least one request is allowed
    pub fn check_any(&self, user: &User, requests: &[CheckRequest]) -> bool {
        self.check_all(user, requests).into_iter().any(|granted| granted)
    }

    /// True when every request is allowed
    pub fn check_every(&self, user: &User, requests: &[CheckRequest]) -> bool {
        self.check_all(user, requests).into_iter().all(|granted| granted)
    }

    /// Actions `user` may perform on `resource` under `context`
    ///
    /// Read-only query for UI gating: no audit records, no cache writes.
    pub fn available_actions(
        &self,
        user: &User,
        resource: &str,
        context: Option<&PermissionContext>,
    ) -> BTreeSet<Action> {
        let Ok(role) = self.registry.get_definition(&user.role) else {
            return BTreeSet::new();
        };

        if role.bypass_all {
            let mut actions = Action::standard();
            actions.extend(self.registry.declared_actions());
            return actions;
        }

        let permissions = self.resolver.effective_permissions(&role.id);
        let Some(permission) = ResourceMatcher::find(&permissions, resource) else {
            return BTreeSet::new();
        };

        let empty = PermissionContext::new();
        if ConditionEvaluator::evaluate(&permission.conditions, context.unwrap_or(&empty)) {
            permission.actions.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Effective permissions of a role (empty for unknown roles)
    pub fn effective_permissions(&self, role_id: &str) -> EffectivePermissions {
        self.resolver.effective_permissions(role_id)
    }

    /// Drop every cached decision
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            info!("Permission cache invalidated");
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(PermissionCache::stats)
    }

    pub fn metrics(&self) -> Option<EngineMetrics> {
        self.metrics.as_ref().map(MetricsCollector::snapshot)
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn is_bypass(&self, user: &User) -> bool {
        self.registry
            .get_definition(&user.role)
            .map(|role| role.bypass_all)
            .unwrap_or(false)
    }

    fn decide(
        &self,
        user: &User,
        resource: &str,
        action: &Action,
        context: Option<&PermissionContext>,
    ) -> Decision {
        let role = match self.registry.get_definition(&user.role) {
            Ok(role) => role,
            Err(e) => {
                warn!("Denying check for user '{}': {}", user.id, e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_unknown_role();
                }
                return Decision::deny(DecisionSource::Evaluated, e.to_string());
            }
        };

        if role.bypass_all {
            return Decision::allow(DecisionSource::Bypass, BYPASS_REASON);
        }

        let Some(cache) = &self.cache else {
            return self.evaluate(role, resource, action, context).decision;
        };

        let key = CacheKey::new(&role.id, resource, action, context);
        if let Some(granted) = cache.get(&key) {
            debug!("Cache hit for {}:{}:{}", role.id, resource, action);
            return Decision {
                granted,
                source: DecisionSource::Cache,
                reason: Some("cached decision".to_string()),
            };
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_cache_miss();
        }

        let evaluation = self.evaluate(role, resource, action, context);
        if evaluation.cacheable {
            cache.put(key, evaluation.decision.granted);
        }
        evaluation.decision
    }

    fn evaluate(
        &self,
        role: &Role,
        resource: &str,
        action: &Action,
        context: Option<&PermissionContext>,
    ) -> Evaluation {
        let permissions = self.resolver.effective_permissions(&role.id);

        let Some(permission) = ResourceMatcher::find(&permissions, resource) else {
            debug!("No permission of role '{}' matches '{}'", role.id, resource);
            return Evaluation::reusable(Decision::deny(
                DecisionSource::Evaluated,
                format!("no permission matches resource '{}'", resource),
            ));
        };

        if !permission.allows(action) {
            return Evaluation::reusable(Decision::deny(
                DecisionSource::Evaluated,
                format!("action '{}' not permitted on '{}'", action, permission.resource),
            ));
        }

        let empty = PermissionContext::new();
        match ConditionEvaluator::try_evaluate(&permission.conditions, context.unwrap_or(&empty)) {
            Ok(true) => Evaluation::reusable(Decision::allow(
                DecisionSource::Evaluated,
                format!("granted by '{}'", permission.resource),
            )),
            Ok(false) => Evaluation::reusable(Decision::deny(
                DecisionSource::Evaluated,
                format!("conditions not satisfied for '{}'", permission.resource),
            )),
            Err(e) => {
                warn!(
                    "Denying {} on '{}' for role '{}': {}",
                    action, resource, role.id, e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_invalid_condition();
                }
                // Never cached
                Evaluation {
                    decision: Decision::deny(DecisionSource::Evaluated, e.to_string()),
                    cacheable: false,
                }
            }
        }
    }
}
