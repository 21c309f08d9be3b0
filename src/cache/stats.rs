//! Cache Statistics Module
//!
//! Per-store counters plus the read-only snapshot returned by
//! [`crate::cache::CacheEngine::get_cache_stats`].

use std::collections::BTreeMap;

use serde::Serialize;

// == Store Counters ==
/// Monotonic lookup counters for one store.
#[derive(Debug, Clone, Default)]
pub struct StoreCounters {
    /// Lookups satisfied from the store
    pub hits: u64,
    /// Lookups that found nothing or a stale entry
    pub misses: u64,
    /// Entries removed by the capacity bound
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
}

impl StoreCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of lookups.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }
}

// == Store Stats ==
/// Point-in-time view of one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
    pub max_entries: usize,
    /// Sum of entry footprints in bytes
    pub memory_usage: usize,
}

impl StoreStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

// == Cache Stats Snapshot ==
/// Aggregate view over every store of an engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub total_memory_usage: usize,
    pub total_entries: usize,
    pub stores: BTreeMap<String, StoreStats>,
}

impl CacheStatsSnapshot {
    /// Hit rate across all stores, 0.0 when nothing was looked up yet.
    pub fn overall_hit_rate(&self) -> f64 {
        let (hits, lookups) = self
            .stores
            .values()
            .fold((0u64, 0u64), |(h, l), s| (h + s.hits, l + s.lookups()));
        if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        }
    }

    /// Total lookups across all stores.
    pub fn total_lookups(&self) -> u64 {
        self.stores.values().map(StoreStats::lookups).sum()
    }
}
