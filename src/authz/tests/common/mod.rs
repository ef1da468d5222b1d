//! Shared test catalog

#![allow(dead_code)]

use console_authz::{EngineConfig, PermissionEngine, RoleRegistry};

/// Console role catalog used across integration tests
pub const CATALOG: &str = r#"{
  "roles": [
    {
      "id": "viewer",
      "name": "Viewer",
      "permissions": [
        { "resource": "content", "actions": ["read"] }
      ]
    },
    {
      "id": "editor",
      "name": "Editor",
      "permissions": [
        { "resource": "content", "actions": ["read", "update"] },
        { "resource": "reports.*", "actions": ["read"] }
      ]
    },
    {
      "id": "teamLead",
      "name": "Team Lead",
      "inheritsFrom": ["editor"],
      "permissions": [
        { "resource": "content", "actions": ["publish"] }
      ]
    },
    {
      "id": "supportAgent",
      "name": "Support Agent",
      "permissions": [
        {
          "resource": "users",
          "actions": ["read"],
          "conditions": [
            { "field": "user.role", "operator": "in", "value": ["user", "trial"] }
          ]
        }
      ]
    },
    {
      "id": "billingManager",
      "name": "Billing Manager",
      "permissions": [
        { "resource": "billing.*", "actions": ["read"] },
        { "resource": "billing.invoices", "actions": ["read", "export"] }
      ]
    },
    {
      "id": "analyst",
      "name": "Analyst",
      "permissions": [
        {
          "resource": "reports.*",
          "actions": ["read", "export"],
          "aliases": ["dashboards"],
          "conditions": [
            { "field": "request.hour", "operator": "less_than", "value": 18 }
          ]
        }
      ]
    },
    {
      "id": "superAdmin",
      "name": "Super Admin",
      "bypassAll": true
    }
  ]
}"#;

pub fn registry() -> RoleRegistry {
    RoleRegistry::from_json(CATALOG).expect("test catalog is valid")
}

pub fn engine() -> PermissionEngine {
    PermissionEngine::new(registry(), EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> PermissionEngine {
    PermissionEngine::new(registry(), config)
}
