//! Permission engine integration tests
//!
//! Full decision pipeline:
//! Role lookup → Bypass → Cache → Inheritance resolution → Resource match → Conditions

mod common;

use console_authz::{
    engine::BYPASS_REASON, Action, AuditQuery, CheckRequest, DecisionSource, PermissionContext,
    User,
};
use std::collections::BTreeSet;

fn user_context(role: &str) -> PermissionContext {
    PermissionContext::new().with("user", PermissionContext::new().with("role", role))
}

// ============================================================================
// CONSOLE SCENARIOS
// ============================================================================

#[test]
fn test_editor_updates_but_cannot_delete_content() {
    let engine = common::engine();
    let editor = User::new("alice", "editor");

    assert!(engine.check(&editor, "content", &Action::update(), None));
    assert!(!engine.check(&editor, "content", &Action::delete(), None));
}

#[test]
fn test_support_agent_condition_on_user_role() {
    let engine = common::engine();
    let agent = User::new("sam", "supportAgent");

    assert!(engine.check(&agent, "users", &Action::read(), Some(&user_context("user"))));
    assert!(engine.check(&agent, "users", &Action::read(), Some(&user_context("trial"))));
    assert!(!engine.check(&agent, "users", &Action::read(), Some(&user_context("admin"))));

    // Missing field fails closed
    assert!(!engine.check(&agent, "users", &Action::read(), None));
}

#[test]
fn test_team_lead_inherits_editor_permissions() {
    let engine = common::engine();

    let effective = engine.effective_permissions("teamLead");
    let content = effective
        .iter()
        .find(|p| p.resource == "content")
        .expect("content entry");

    let expected: BTreeSet<Action> = ["read", "update", "publish"].into_iter().map(Action::from).collect();
    assert_eq!(content.actions, expected);

    let lead = User::new("lee", "teamLead");
    assert!(engine.check(&lead, "content", &Action::publish(), None));
    assert!(engine.check(&lead, "content", &Action::update(), None));
    assert!(engine.check(&lead, "reports.weekly", &Action::read(), None));
    assert!(!engine.check(&lead, "content", &Action::delete(), None));
}

#[test]
fn test_bypass_all_role_allows_everything() {
    let engine = common::engine();
    let admin = User::new("root", "superAdmin");

    assert!(engine.check(&admin, "content", &Action::delete(), None));
    assert!(engine.check(&admin, "not.in.catalog", &Action::new("launch"), None));

    let records = engine.audit().query(&AuditQuery::new().user("root"));
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.granted && r.reason.as_deref() == Some(BYPASS_REASON)));

    // Bypass never touches the cache
    assert_eq!(engine.cache_stats().unwrap().entries, 0);
}

#[test]
fn test_wildcard_resource_pattern() {
    let engine = common::engine();
    let editor = User::new("alice", "editor");

    assert!(engine.check(&editor, "reports.monthly", &Action::read(), None));
    assert!(!engine.check(&editor, "reports.monthly", &Action::export(), None));
    assert!(!engine.check(&editor, "reportsmonthly", &Action::read(), None));
}

#[test]
fn test_cache_miss_then_hit_are_both_audited() {
    let engine = common::engine();
    let editor = User::new("alice", "editor");

    let first = engine.check_decision(&editor, "content", &Action::update(), None);
    let second = engine.check_decision(&editor, "content", &Action::update(), None);

    assert_eq!(first.granted, second.granted);
    assert_eq!(first.source, DecisionSource::Evaluated);
    assert_eq!(second.source, DecisionSource::Cache);

    assert_eq!(engine.audit().len(), 2);
    let stats = engine.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

// ============================================================================
// MATCHING AND FAILURE SEMANTICS
// ============================================================================

#[test]
fn test_exact_pattern_beats_wildcard() {
    let engine = common::engine();
    let manager = User::new("bea", "billingManager");

    assert!(engine.check(&manager, "billing.invoices", &Action::export(), None));
    assert!(!engine.check(&manager, "billing.payouts", &Action::export(), None));
    assert!(engine.check(&manager, "billing.payouts", &Action::read(), None));
}

#[test]
fn test_alias_resolves_to_entry() {
    let engine = common::engine();
    let analyst = User::new("ana", "analyst");
    let morning = PermissionContext::new().with("request", PermissionContext::new().with("hour", 9i64));
    let evening = PermissionContext::new().with("request", PermissionContext::new().with("hour", 20i64));

    assert!(engine.check(&analyst, "dashboards", &Action::read(), Some(&morning)));
    assert!(!engine.check(&analyst, "dashboards", &Action::read(), Some(&evening)));
}

#[test]
fn test_unknown_role_and_resource_deny() {
    let engine = common::engine();

    let ghost = User::new("ghost", "nobody");
    let decision = engine.check_decision(&ghost, "content", &Action::read(), None);
    assert!(!decision.granted);
    assert!(decision.reason.unwrap().contains("nobody"));

    let viewer = User::new("vic", "viewer");
    assert!(!engine.check(&viewer, "billing.invoices", &Action::read(), None));

    // Unknown-role denials are audited but never cached
    assert_eq!(engine.audit().query(&AuditQuery::new().user("ghost")).len(), 1);
    assert_eq!(engine.cache_stats().unwrap().entries, 1);
}

#[test]
fn test_context_changes_cache_key() {
    let engine = common::engine();
    let agent = User::new("sam", "supportAgent");

    assert!(engine.check(&agent, "users", &Action::read(), Some(&user_context("user"))));
    assert!(!engine.check(&agent, "users", &Action::read(), Some(&user_context("admin"))));
    assert!(engine.check(&agent, "users", &Action::read(), Some(&user_context("user"))));

    assert_eq!(engine.cache_stats().unwrap().entries, 2);
}

#[test]
fn test_invalidate_cache() {
    let engine = common::engine();
    let editor = User::new("alice", "editor");

    engine.check(&editor, "content", &Action::read(), None);
    assert_eq!(engine.cache_stats().unwrap().entries, 1);

    engine.invalidate_cache();
    assert_eq!(engine.cache_stats().unwrap().entries, 0);

    let decision = engine.check_decision(&editor, "content", &Action::read(), None);
    assert_eq!(decision.source, DecisionSource::Evaluated);
    assert!(decision.granted);
}

// ============================================================================
// BATCH AND UI QUERIES
// ============================================================================

#[test]
fn test_batch_checks() {
    let engine = common::engine();
    let editor = User::new("alice", "editor");

    let requests = vec![
        CheckRequest::new("content", "read"),
        CheckRequest::new("content", "delete"),
        CheckRequest::new("reports.q3", "read"),
    ];

    assert_eq!(engine.check_all(&editor, &requests), vec![true, false, true]);
    assert!(engine.check_any(&editor, &requests));
    assert!(!engine.check_every(&editor, &requests));
    assert!(!engine.check_any(&editor, &[CheckRequest::new("billing", "read")]));
    assert_eq!(engine.audit().len(), 3 + 3 + 3 + 1);
}

#[test]
fn test_batch_checks_for_bypass_user() {
    let engine = common::engine();
    let admin = User::new("root", "superAdmin");

    let requests = vec![
        CheckRequest::new("content", "delete"),
        CheckRequest::new("anything", "launch"),
    ];

    assert_eq!(engine.check_all(&admin, &requests), vec![true, true]);
    assert!(engine.check_every(&admin, &requests));

    let records = engine.audit().query(&AuditQuery::new());
    assert!(records.iter().all(|r| r.source == DecisionSource::Bypass));
}

#[test]
fn test_batch_request_context_is_used() {
    let engine = common::engine();
    let agent = User::new("sam", "supportAgent");

    let requests = vec![
        CheckRequest::new("users", "read").with_context(user_context("trial")),
        CheckRequest::new("users", "read").with_context(user_context("admin")),
        CheckRequest::new("users", "read"),
    ];

    assert_eq!(engine.check_all(&agent, &requests), vec![true, false, false]);
}

#[test]
fn test_available_actions() {
    let engine = common::engine();

    let lead = User::new("lee", "teamLead");
    let actions: Vec<String> = engine
        .available_actions(&lead, "content", None)
        .into_iter()
        .map(|a| a.to_string())
        .collect();
    assert_eq!(actions, vec!["publish", "read", "update"]);

    let agent = User::new("sam", "supportAgent");
    assert!(engine.available_actions(&agent, "users", Some(&user_context("admin"))).is_empty());
    assert_eq!(
        engine.available_actions(&agent, "users", Some(&user_context("user"))).len(),
        1
    );

    assert!(engine
        .available_actions(&User::new("x", "nobody"), "content", None)
        .is_empty());

    // Read-only: nothing audited
    assert!(engine.audit().is_empty());
}

#[test]
fn test_available_actions_for_bypass_user() {
    let engine = common::engine();
    let actions = engine.available_actions(&User::new("root", "superAdmin"), "anything", None);

    assert!(Action::standard().is_subset(&actions));
    assert!(actions.contains(&Action::export()));
    assert!(actions.contains(&Action::publish()));
}

// ============================================================================
// AUDIT AND METRICS
// ============================================================================

#[test]
fn test_audit_record_contents() {
    let engine = common::engine();
    let agent = User::new("sam", "supportAgent");
    let context = user_context("admin");

    engine.check(&agent, "users", &Action::read(), Some(&context));

    let records = engine.audit().query(&AuditQuery::new().user("sam"));
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.role, "supportAgent");
    assert_eq!(record.resource, "users");
    assert_eq!(record.action, Action::read());
    assert!(!record.granted);
    assert_eq!(record.context, context);
    assert_eq!(
        record.reason.as_deref(),
        Some("conditions not satisfied for 'users'")
    );
}

#[tokio::test]
async fn test_audit_subscription_streams_decisions() {
    let engine = common::engine();
    let mut rx = engine.audit().subscribe();

    engine.check(&User::new("alice", "editor"), "content", &Action::read(), None);
    engine.check(&User::new("root", "superAdmin"), "content", &Action::delete(), None);

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first.user_id, "alice");
    assert_eq!(second.source, DecisionSource::Bypass);
}

#[test]
fn test_metrics_snapshot() {
    let engine = common::engine();
    let editor = User::new("alice", "editor");

    engine.check(&editor, "content", &Action::read(), None);
    engine.check(&editor, "content", &Action::read(), None);
    engine.check(&editor, "content", &Action::delete(), None);
    engine.check(&User::new("root", "superAdmin"), "content", &Action::delete(), None);
    engine.check(&User::new("ghost", "nobody"), "content", &Action::read(), None);

    let metrics = engine.metrics().unwrap();
    assert_eq!(metrics.total_checks, 5);
    assert_eq!(metrics.allowed_decisions, 3);
    assert_eq!(metrics.denied_decisions, 2);
    assert_eq!(metrics.bypass_decisions, 1);
    assert_eq!(metrics.cache_hits, 1);
    assert_eq!(metrics.cache_misses, 2);
    assert_eq!(metrics.unknown_roles, 1);
}
