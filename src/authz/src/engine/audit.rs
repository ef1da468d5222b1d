//! Bounded audit trail of permission decisions
//!
//! Every `check()` appends exactly one [`AuditRecord`]. Records live in a
//! fixed-capacity FIFO ring buffer (oldest evicted first) and are also
//! published on a broadcast channel so an external collaborator can ship
//! them to durable storage. Publishing never blocks: a subscriber that
//! falls behind loses its oldest undelivered records.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::decision::{Decision, DecisionSource};
use crate::context::PermissionContext;
use crate::types::{Action, User};

/// Audit trail configuration
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Ring buffer capacity
    pub capacity: usize,

    /// Per-subscriber backlog of the broadcast stream
    pub broadcast_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000,
            broadcast_capacity: 256,
        }
    }
}

/// Immutable record of one permission decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique entry ID
    pub id: Uuid,

    pub user_id: String,

    /// Role the decision was evaluated for
    pub role: String,

    pub resource: String,

    pub action: Action,

    pub granted: bool,

    /// Snapshot of the caller-supplied context
    #[serde(default)]
    pub context: PermissionContext,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub source: DecisionSource,
}

impl AuditRecord {
    /// Build a record for a decision taken now
    pub fn new(
        user: &User,
        resource: &str,
        action: &Action,
        context: Option<&PermissionContext>,
        decision: &Decision,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user.id.clone(),
            role: user.role.clone(),
            resource: resource.to_string(),
            action: action.clone(),
            granted: decision.granted,
            context: context.cloned().unwrap_or_default(),
            timestamp: Utc::now(),
            reason: decision.reason.clone(),
            source: decision.source,
        }
    }
}

/// Filters for [`AuditTrail::query`]; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub resource: Option<String>,
    pub action: Option<Action>,
    pub granted: Option<bool>,

    /// Inclusive lower bound
    pub since: Option<DateTime<Utc>>,

    /// Inclusive upper bound
    pub until: Option<DateTime<Utc>>,

    /// Maximum number of records returned
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn action(mut self, action: impl Into<Action>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn granted(mut self, granted: bool) -> Self {
        self.granted = Some(granted);
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, record: &AuditRecord) -> bool {
        self.user_id.as_ref().map_or(true, |id| &record.user_id == id)
            && self.resource.as_ref().map_or(true, |r| &record.resource == r)
            && self.action.as_ref().map_or(true, |a| &record.action == a)
            && self.granted.map_or(true, |g| record.granted == g)
            && self.since.map_or(true, |since| record.timestamp >= since)
            && self.until.map_or(true, |until| record.timestamp <= until)
    }
}

/// Audit statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditStats {
    pub total_decisions: usize,
    pub allowed_decisions: usize,
    pub denied_decisions: usize,
}

/// In-memory ring buffer of audit records
pub struct AuditTrail {
    buffer: Mutex<VecDeque<AuditRecord>>,
    capacity: usize,
    sender: broadcast::Sender<AuditRecord>,
}

impl AuditTrail {
    /// Create a new audit trail
    pub fn new(config: AuditConfig) -> Self {
        let (sender, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Self {
            buffer: Mutex::new(VecDeque::with_capacity(config.capacity.min(4_096))),
            capacity: config.capacity.max(1),
            sender,
        }
    }

    /// Append a record, evicting the oldest one when full
    pub fn record(&self, record: AuditRecord) {
        {
            let mut buffer = self.buffer.lock();
            if buffer.len() >= self.capacity {
                buffer.pop_front();
            }
            buffer.push_back(record.clone());
        }

        // No subscribers is not an error
        let _ = self.sender.send(record);
    }

    /// Records matching `query`, newest first
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditRecord> {
        let buffer = self.buffer.lock();

        buffer
            .iter()
            .rev()
            .filter(|record| query.matches(record))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Stream of every record appended after this call
    pub fn subscribe(&self) -> broadcast::Receiver<AuditRecord> {
        self.sender.subscribe()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    /// Get audit statistics over the retained records
    pub fn stats(&self) -> AuditStats {
        let buffer = self.buffer.lock();
        let allowed = buffer.iter().filter(|r| r.granted).count();

        AuditStats {
            total_decisions: buffer.len(),
            allowed_decisions: allowed,
            denied_decisions: buffer.len() - allowed,
        }
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(AuditConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(user: &str, resource: &str, granted: bool) -> AuditRecord {
        let decision = if granted {
            Decision::allow(DecisionSource::Evaluated, "test")
        } else {
            Decision::deny(DecisionSource::Evaluated, "test")
        };
        AuditRecord::new(&User::new(user, "editor"), resource, &Action::read(), None, &decision)
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let trail = AuditTrail::new(AuditConfig {
            capacity: 3,
            ..Default::default()
        });

        for i in 0..5 {
            trail.record(record("alice", &format!("doc:{i}"), true));
        }

        assert_eq!(trail.len(), 3);
        let resources: Vec<_> = trail
            .query(&AuditQuery::new())
            .into_iter()
            .map(|r| r.resource)
            .collect();
        assert_eq!(resources, vec!["doc:4", "doc:3", "doc:2"]);
    }

    #[test]
    fn test_query_filters() {
        let trail = AuditTrail::default();
        trail.record(record("alice", "content", true));
        trail.record(record("bob", "content", false));
        trail.record(record("alice", "billing", false));

        assert_eq!(trail.query(&AuditQuery::new().user("alice")).len(), 2);
        assert_eq!(trail.query(&AuditQuery::new().resource("content")).len(), 2);
        assert_eq!(trail.query(&AuditQuery::new().granted(false)).len(), 2);
        assert_eq!(trail.query(&AuditQuery::new().action("delete")).len(), 0);
        assert_eq!(trail.query(&AuditQuery::new().user("alice").limit(1))[0].resource, "billing");
    }

    #[test]
    fn test_query_time_range() {
        let trail = AuditTrail::default();
        trail.record(record("alice", "content", true));

        let now = Utc::now();
        let hour = Duration::hours(1);
        assert_eq!(trail.query(&AuditQuery::new().between(now - hour, now + hour)).len(), 1);
        assert_eq!(trail.query(&AuditQuery::new().since(now + hour)).len(), 0);
        assert_eq!(trail.query(&AuditQuery::new().until(now - hour)).len(), 0);
    }

    #[test]
    fn test_stats() {
        let trail = AuditTrail::default();
        trail.record(record("alice", "content", true));
        trail.record(record("alice", "content", false));

        assert_eq!(
            trail.stats(),
            AuditStats {
                total_decisions: 2,
                allowed_decisions: 1,
                denied_decisions: 1,
            }
        );

        trail.clear();
        assert!(trail.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_receives_new_records() {
        let trail = AuditTrail::default();
        trail.record(record("before", "content", true));

        let mut rx = trail.subscribe();
        trail.record(record("after", "content", true));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.user_id, "after");
    }
}
