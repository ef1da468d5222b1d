//! Decision metrics for engine observability

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::decision::DecisionSource;

/// Engine performance metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineMetrics {
    /// Total number of checks
    pub total_checks: u64,

    pub allowed_decisions: u64,

    pub denied_decisions: u64,

    /// Checks answered by a bypass-all role
    pub bypass_decisions: u64,

    pub cache_hits: u64,

    pub cache_misses: u64,

    /// Checks for roles missing from the catalog
    pub unknown_roles: u64,

    /// Denials caused by malformed conditions
    pub invalid_conditions: u64,

    /// Latency percentiles in microseconds
    pub latency_p50_us: f64,
    pub latency_p99_us: f64,

    pub avg_latency_us: f64,
}

impl EngineMetrics {
    /// Calculate cache hit rate
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed_decisions + self.denied_decisions;
        if total == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / total as f64
        }
    }
}

/// Metrics collector
///
/// Counters are lock-free. Recording a latency only appends to a bounded
/// sample window; percentiles are computed when a snapshot is taken.
pub struct MetricsCollector {
    total_checks: AtomicU64,
    allowed_decisions: AtomicU64,
    denied_decisions: AtomicU64,
    bypass_decisions: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    unknown_roles: AtomicU64,
    invalid_conditions: AtomicU64,

    /// Recent latency samples (microseconds) for percentiles
    latency_samples: Mutex<VecDeque<f64>>,

    max_samples: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::with_max_samples(10_000)
    }

    /// Collector keeping at most `max_samples` latency samples
    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            total_checks: AtomicU64::new(0),
            allowed_decisions: AtomicU64::new(0),
            denied_decisions: AtomicU64::new(0),
            bypass_decisions: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            unknown_roles: AtomicU64::new(0),
            invalid_conditions: AtomicU64::new(0),
            latency_samples: Mutex::new(VecDeque::with_capacity(max_samples.min(1_024))),
            max_samples: max_samples.max(1),
        }
    }

    /// Record one finished check
    pub fn record_decision(&self, granted: bool, source: DecisionSource, latency: Duration) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);

        if granted {
            self.allowed_decisions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied_decisions.fetch_add(1, Ordering::Relaxed);
        }

        match source {
            DecisionSource::Bypass => {
                self.bypass_decisions.fetch_add(1, Ordering::Relaxed);
            }
            DecisionSource::Cache => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            DecisionSource::Evaluated => {}
        }

        self.record_latency(latency);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_role(&self) {
        self.unknown_roles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_condition(&self) {
        self.invalid_conditions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, latency: Duration) {
        let latency_us = latency.as_secs_f64() * 1_000_000.0;

        let mut samples = self.latency_samples.lock();
        if samples.len() >= self.max_samples {
            samples.pop_front();
        }
        samples.push_back(latency_us);
    }

    /// Number of latency samples currently retained
    pub fn sample_count(&self) -> usize {
        self.latency_samples.lock().len()
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> EngineMetrics {
        // Copy out so sorting happens outside the lock
        let mut sorted: Vec<f64> = self.latency_samples.lock().iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let avg_latency_us = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };

        EngineMetrics {
            total_checks: self.total_checks.load(Ordering::Relaxed),
            allowed_decisions: self.allowed_decisions.load(Ordering::Relaxed),
            denied_decisions: self.denied_decisions.load(Ordering::Relaxed),
            bypass_decisions: self.bypass_decisions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            unknown_roles: self.unknown_roles.load(Ordering::Relaxed),
            invalid_conditions: self.invalid_conditions.load(Ordering::Relaxed),
            latency_p50_us: Self::percentile(&sorted, 0.50),
            latency_p99_us: Self::percentile(&sorted, 0.99),
            avg_latency_us,
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        for counter in [
            &self.total_checks,
            &self.allowed_decisions,
            &self.denied_decisions,
            &self.bypass_decisions,
            &self.cache_hits,
            &self.cache_misses,
            &self.unknown_roles,
            &self.invalid_conditions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.latency_samples.lock().clear();
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
