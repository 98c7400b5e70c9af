//! Cache Statistics Module
//!
//! Hit/miss counters shared across tasks, and the introspection snapshot
//! returned by `CacheManager::stats`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Distributed Status ==
/// Availability of the distributed tier at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DistributedStatus {
    /// A backend was configured at startup
    pub configured: bool,
    /// The last call against it succeeded
    pub available: bool,
}

// == Cache Stats ==
/// Point-in-time view of the cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Entries physically held by the Entry Store (expired but unswept included)
    pub local_size: usize,
    /// Keys physically held by the Entry Store, sorted
    pub local_keys: Vec<String>,
    /// Distributed tier health
    pub distributed: DistributedStatus,
    /// Lookups answered from either tier
    pub hits: u64,
    /// Lookups answered from the distributed tier
    pub distributed_hits: u64,
    /// Lookups answered from the Entry Store
    pub local_hits: u64,
    /// Lookups that found nothing live
    pub misses: u64,
    /// Local entries dropped because their TTL elapsed
    pub expired_removed: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Counters ==
/// Lock-free lookup counters updated on every `get`.
#[derive(Debug, Default)]
pub struct StatsCounters {
    distributed_hits: AtomicU64,
    local_hits: AtomicU64,
    misses: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_distributed_hit(&self) {
        self.distributed_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters into `stats`.
    pub fn fill(&self, stats: &mut CacheStats) {
        let distributed_hits = self.distributed_hits.load(Ordering::Relaxed);
        let local_hits = self.local_hits.load(Ordering::Relaxed);
        stats.distributed_hits = distributed_hits;
        stats.local_hits = local_hits;
        stats.hits = distributed_hits + local_hits;
        stats.misses = self.misses.load(Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.distributed_hits.store(0, Ordering::Relaxed);
        self.local_hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}
