//! Cache Store Engine
//!
//! Owns every named store and the metric buffer. All mutation of cache state
//! goes through the operations defined here.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::entry::{current_timestamp_ms, estimate_size, serialized_len};
use crate::cache::metrics::{DEFAULT_MAX_AGE_MS, DEFAULT_MAX_PER_CATEGORY};
use crate::cache::{
    CacheEntry, CacheStatsSnapshot, CacheStore, Invalidation, MetricBuffer,
    PerformanceMetricRecord, Removed, SetOptions, StoreConfig, StorePriority, MAX_KEY_LENGTH,
    MAX_VALUE_SIZE,
};
use crate::error::{CacheError, Result};

/// Engine handle shared between the monitor, the HTTP layer and tasks.
pub type SharedEngine = Arc<RwLock<CacheEngine>>;

// == Engine Config ==
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Limits for stores without a named profile
    pub default_store: StoreConfig,
    /// Limits for well-known store names
    pub profiles: HashMap<String, StoreConfig>,
    /// Aggressive cleanup keeps entries read within this window
    pub aggressive_recent_window_ms: u64,
    pub metric_max_per_category: usize,
    pub metric_max_age_ms: u64,
}

impl EngineConfig {
    pub fn with_profile(mut self, name: &str, config: StoreConfig) -> Self {
        self.profiles.insert(name.to_string(), config);
        self
    }

    fn store_config(&self, name: &str) -> StoreConfig {
        self.profiles
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.default_store.clone())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let profiles = HashMap::from([
            (
                "api".to_string(),
                StoreConfig::new(100, 5 * 60 * 1000, StorePriority::Normal),
            ),
            (
                "static".to_string(),
                StoreConfig::new(200, 30 * 60 * 1000, StorePriority::Low),
            ),
            (
                "user".to_string(),
                StoreConfig::new(50, 10 * 60 * 1000, StorePriority::High),
            ),
        ]);
        Self {
            default_store: StoreConfig::default(),
            profiles,
            aggressive_recent_window_ms: 60 * 1000,
            metric_max_per_category: DEFAULT_MAX_PER_CATEGORY,
            metric_max_age_ms: DEFAULT_MAX_AGE_MS,
        }
    }
}

// == Cleanup Report ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupLevel {
    Memory,
    Aggressive,
}

/// Outcome of a memory or aggressive cleanup pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupReport {
    pub level: CleanupLevel,
    pub removed_entries: usize,
    pub freed_bytes: usize,
    pub memory_before: usize,
    pub memory_after: usize,
}

// == Cache Engine ==
/// Multi-store cache with LRU eviction, TTL expiry and memory cleanup.
#[derive(Debug)]
pub struct CacheEngine {
    stores: HashMap<String, CacheStore>,
    metrics: MetricBuffer,
    config: EngineConfig,
    /// Cleared by `destroy`; every later call fails with `NotInitialized`
    initialized: bool,
}

impl CacheEngine {
    // == Constructor ==
    pub fn new(config: EngineConfig) -> Self {
        let metrics = MetricBuffer::new(config.metric_max_per_category, config.metric_max_age_ms);
        Self {
            stores: HashMap::new(),
            metrics,
            config,
            initialized: true,
        }
    }

    /// Wraps a fresh engine for sharing.
    pub fn shared(config: EngineConfig) -> SharedEngine {
        Arc::new(RwLock::new(Self::new(config)))
    }

    fn ensure_initialized(&self, operation: &str) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(CacheError::destroyed(operation))
        }
    }

    // == Get ==
    /// Looks up `key` in `store`. `Ok(None)` is a miss.
    pub fn get(&mut self, store: &str, key: &str) -> Result<Option<Value>> {
        self.get_at(store, key, current_timestamp_ms())
    }

    pub fn get_at(&mut self, store: &str, key: &str, now: u64) -> Result<Option<Value>> {
        self.ensure_initialized("get")?;
        Ok(self
            .stores
            .get_mut(store)
            .and_then(|s| s.get(key, now)))
    }

    // == Set ==
    /// Creates or replaces an entry, evicting LRU entries over capacity.
    pub fn set(&mut self, store: &str, key: &str, value: Value, options: SetOptions) -> Result<()> {
        self.set_at(store, key, value, options, current_timestamp_ms())
    }

    pub fn set_at(
        &mut self,
        store: &str,
        key: &str,
        value: Value,
        options: SetOptions,
        now: u64,
    ) -> Result<()> {
        self.ensure_initialized("set")?;
        validate_set(store, key, &value)?;

        let config = self.config.store_config(store);
        let target = self
            .stores
            .entry(store.to_string())
            .or_insert_with(|| {
                debug!("Creating cache store '{}'", store);
                CacheStore::new(store, config)
            });

        let size = options
            .size_bytes
            .unwrap_or_else(|| estimate_size(key, &value));
        let ttl = options.ttl_ms.or(target.config().default_ttl_ms);
        let mut entry = CacheEntry::new(key.to_string(), value, ttl, size, now);
        entry.high_priority = options.high_priority;

        let evicted = target.set(entry);
        if evicted > 0 {
            debug!("Store '{}': evicted {} LRU entr(ies)", store, evicted);
        }
        Ok(())
    }

    // == Invalidate ==
    /// Removes entries of `store` selected by `filter`; unknown stores or keys
    /// remove nothing.
    pub fn invalidate(&mut self, store: &str, filter: Invalidation<'_>) -> Result<usize> {
        self.invalidate_at(store, filter, current_timestamp_ms())
    }

    pub fn invalidate_at(&mut self, store: &str, filter: Invalidation<'_>, now: u64) -> Result<usize> {
        self.ensure_initialized("invalidate")?;
        let removed = self
            .stores
            .get_mut(store)
            .map(|s| s.invalidate(&filter, now))
            .unwrap_or_default();
        if removed.entries > 0 {
            debug!(
                "Store '{}': invalidated {} entr(ies), {} bytes",
                store, removed.entries, removed.bytes
            );
        }
        Ok(removed.entries)
    }

    // == Stats ==
    /// Read-only snapshot of all stores.
    pub fn get_cache_stats(&self) -> Result<CacheStatsSnapshot> {
        self.ensure_initialized("get_cache_stats")?;
        let mut snapshot = CacheStatsSnapshot::default();
        for (name, store) in &self.stores {
            let stats = store.stats();
            snapshot.total_entries += stats.size;
            snapshot.total_memory_usage += stats.memory_usage;
            snapshot.stores.insert(name.clone(), stats);
        }
        Ok(snapshot)
    }

    /// Sum of entry footprints over all stores.
    pub fn total_memory_usage(&self) -> usize {
        self.stores.values().map(CacheStore::memory_usage).sum()
    }

    // == Cleanup ==
    /// Drops expired entries and entries older than their store's max age.
    pub fn perform_memory_cleanup(&mut self) -> Result<CleanupReport> {
        self.perform_memory_cleanup_at(current_timestamp_ms())
    }

    pub fn perform_memory_cleanup_at(&mut self, now: u64) -> Result<CleanupReport> {
        self.ensure_initialized("perform_memory_cleanup")?;
        let memory_before = self.total_memory_usage();
        let removed = self.memory_pass(now);
        let report = self.report(CleanupLevel::Memory, removed, memory_before);
        info!(
            "Memory cleanup: removed {} entr(ies), {} -> {} bytes",
            report.removed_entries, report.memory_before, report.memory_after
        );
        Ok(report)
    }

    /// Memory cleanup, then sheds non-recent entries of every store below
    /// `High` priority and trims those stores to half capacity. Pinned
    /// entries are never removed by this pass.
    pub fn perform_aggressive_cleanup(&mut self) -> Result<CleanupReport> {
        self.perform_aggressive_cleanup_at(current_timestamp_ms())
    }

    pub fn perform_aggressive_cleanup_at(&mut self, now: u64) -> Result<CleanupReport> {
        self.ensure_initialized("perform_aggressive_cleanup")?;
        let memory_before = self.total_memory_usage();
        let mut removed = self.memory_pass(now);

        let window = self.config.aggressive_recent_window_ms;
        for store in self
            .stores
            .values_mut()
            .filter(|s| s.config().priority < StorePriority::High)
        {
            removed += store.remove_idle(window, now);
            let half = store.config().max_entries / 2;
            removed += store.trim_to(half);
        }

        let report = self.report(CleanupLevel::Aggressive, removed, memory_before);
        info!(
            "Aggressive cleanup: removed {} entr(ies), {} -> {} bytes",
            report.removed_entries, report.memory_before, report.memory_after
        );
        Ok(report)
    }

    fn memory_pass(&mut self, now: u64) -> Removed {
        let mut removed = Removed::default();
        for store in self.stores.values_mut() {
            removed += store.remove_expired(now);
            removed += store.remove_stale(now);
        }
        removed
    }

    fn report(&self, level: CleanupLevel, removed: Removed, memory_before: usize) -> CleanupReport {
        CleanupReport {
            level,
            removed_entries: removed.entries,
            freed_bytes: removed.bytes,
            memory_before,
            memory_after: self.total_memory_usage(),
        }
    }

    /// Removes TTL-expired entries only. Returns how many were dropped.
    pub fn sweep_expired(&mut self) -> Result<usize> {
        self.sweep_expired_at(current_timestamp_ms())
    }

    pub fn sweep_expired_at(&mut self, now: u64) -> Result<usize> {
        self.ensure_initialized("sweep_expired")?;
        Ok(self
            .stores
            .values_mut()
            .map(|s| s.remove_expired(now).entries)
            .sum())
    }

    // == Metrics ==
    /// Appends a record to the rolling metric buffer.
    pub fn record_performance_metric(&mut self, category: &str, payload: Value) -> Result<()> {
        self.record_performance_metric_at(category, payload, current_timestamp_ms())
    }

    pub fn record_performance_metric_at(
        &mut self,
        category: &str,
        payload: Value,
        now: u64,
    ) -> Result<()> {
        self.ensure_initialized("record_performance_metric")?;
        if category.is_empty() {
            return Err(CacheError::InvalidArgument(
                "Metric category cannot be empty".to_string(),
            ));
        }
        self.metrics.record(category, payload, now);
        Ok(())
    }

    /// Records of one metric category, oldest first.
    pub fn metrics(&self, category: &str) -> Result<Vec<PerformanceMetricRecord>> {
        self.ensure_initialized("metrics")?;
        Ok(self.metrics.records(category))
    }

    pub fn latest_metric(&self, category: &str) -> Result<Option<PerformanceMetricRecord>> {
        self.ensure_initialized("latest_metric")?;
        Ok(self.metrics.latest(category).cloned())
    }

    /// Drops metric records past their age bound.
    pub fn prune_metrics(&mut self) -> Result<usize> {
        self.ensure_initialized("prune_metrics")?;
        Ok(self.metrics.prune_all(current_timestamp_ms()))
    }

    // == Inspection ==
    /// Reads an entry without counting a lookup.
    pub fn peek(&self, store: &str, key: &str) -> Option<&CacheEntry> {
        self.stores.get(store).and_then(|s| s.peek(key))
    }

    pub fn store(&self, name: &str) -> Option<&CacheStore> {
        self.stores.get(name)
    }

    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // == Destroy ==
    /// Releases every store and metric record. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if !self.initialized {
            return;
        }
        for store in self.stores.values_mut() {
            store.clear();
        }
        self.stores.clear();
        self.metrics.clear();
        self.initialized = false;
        info!("Cache engine destroyed");
    }
}

impl Default for CacheEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn validate_set(store: &str, key: &str, value: &Value) -> Result<()> {
    if store.is_empty() {
        return Err(CacheError::InvalidArgument(
            "Store name cannot be empty".to_string(),
        ));
    }
    if key.is_empty() {
        return Err(CacheError::InvalidArgument("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidArgument(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if value.is_null() {
        return Err(CacheError::InvalidArgument(format!(
            "Missing value for key '{}'",
            key
        )));
    }
    if serialized_len(value) > MAX_VALUE_SIZE {
        return Err(CacheError::InvalidArgument(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }
    Ok(())
}
