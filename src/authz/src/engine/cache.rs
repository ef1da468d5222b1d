//! TTL-based permission decision cache
//!
//! The cache is purely an optimization: disabling it never changes a
//! decision. Expired entries are dropped lazily, on the read that finds
//! them, or en masse by [`PermissionCache::invalidate_all`].

use blake3::Hasher;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::context::PermissionContext;
use crate::types::Action;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache
    pub capacity: usize,

    /// Time-to-live for cached decisions
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(300),
        }
    }
}

/// BLAKE3 digest of (role, resource, action, canonical context)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Compute the key for a check
    ///
    /// Context keys are hashed in sorted order, so two contexts with the
    /// same contents always share a key. A missing context and an empty
    /// one are equivalent.
    pub fn new(
        role: &str,
        resource: &str,
        action: &Action,
        context: Option<&PermissionContext>,
    ) -> Self {
        let mut hasher = Hasher::new();

        for part in [role, resource, action.as_str()] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }

        match context {
            Some(context) => context.hash_into(&mut hasher),
            None => PermissionContext::new().hash_into(&mut hasher),
        }

        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Cached result with its expiry instant
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    granted: bool,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(granted: bool, ttl: Duration) -> Self {
        Self {
            granted,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe decision cache
///
/// Provides:
/// - Sharded in-memory map (DashMap) safe under concurrent access
/// - TTL-based lazy expiration
/// - Bounded size with expired-first batch eviction
///
/// The capacity bound is approximate under concurrency: the size check and
/// the insert are separate shard operations, so racing misses can overshoot
/// `capacity` by up to the number of concurrent writers until the next
/// eviction pass.
pub struct PermissionCache {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,

    config: CacheConfig,

    stats: Arc<DashMap<&'static str, usize>>,
}

impl PermissionCache {
    /// Create a new cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
            stats: Arc::new(DashMap::new()),
        }
    }

    /// Cached result, or `None` on a miss or an expired entry
    pub fn get(&self, key: &CacheKey) -> Option<bool> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(now) {
                // Expired - release the shard lock before removing
                drop(entry);
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                self.increment_stat("expirations");
                self.increment_stat("misses");
                return None;
            }

            self.increment_stat("hits");
            return Some(entry.granted);
        }

        self.increment_stat("misses");
        None
    }

    /// Store a result with the configured TTL
    pub fn put(&self, key: CacheKey, granted: bool) {
        self.put_with_ttl(key, granted, self.config.ttl);
    }

    /// Store a result with an explicit TTL
    ///
    /// A put into a full cache triggers one eviction pass that frees about a
    /// tenth of the capacity, so the scan cost is spread over many puts.
    pub fn put_with_ttl(&self, key: CacheKey, granted: bool, ttl: Duration) {
        if self.config.capacity == 0 {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.capacity {
            self.evict();
        }

        self.entries.insert(key, CacheEntry::new(granted, ttl));
    }

    /// Drop every entry and reset the hit/miss/expiration/eviction counters
    ///
    /// Checks already past their cache read may still complete with
    /// pre-invalidation state.
    pub fn invalidate_all(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.stats.clear();
        debug!("Permission cache invalidated ({} entries dropped)", dropped);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            evictions: self.get_stat("evictions"),
            entries: self.entries.len(),
            capacity: self.config.capacity,
        }
    }

    /// Drop expired entries plus enough live ones to free a tenth of capacity
    ///
    /// Live victims are simply the first encountered during the scan.
    fn evict(&self) {
        let now = Instant::now();
        let batch = (self.config.capacity / 10).max(1);
        let mut live_removed = 0;
        let mut evicted = 0;

        self.entries.retain(|_, entry| {
            if entry.is_expired(now) {
                evicted += 1;
                false
            } else if live_removed < batch {
                live_removed += 1;
                evicted += 1;
                false
            } else {
                true
            }
        });

        if evicted > 0 {
            self.stats
                .entry("evictions")
                .and_modify(|count| *count += evicted)
                .or_insert(evicted);
        }
        debug!("Permission cache evicted {} entries", evicted);
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub expirations: usize,
    pub evictions: usize,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
