//! Cache Store Module
//!
//! One named store: HashMap storage with LRU ordering, lazy TTL expiry and
//! incremental memory accounting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{CacheEntry, LruTracker, StoreCounters, StoreStats};

// == Store Priority ==
/// How much a store is worth keeping under memory pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorePriority {
    Low,
    Normal,
    High,
}

// == Store Config ==
/// Per-store limits.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Capacity bound enforced after every insertion
    pub max_entries: usize,
    /// Entries older than this are dropped by memory cleanup
    pub max_age_ms: u64,
    /// TTL applied when a `set` carries none
    pub default_ttl_ms: Option<u64>,
    pub priority: StorePriority,
}

impl StoreConfig {
    pub fn new(max_entries: usize, max_age_ms: u64, priority: StorePriority) -> Self {
        Self {
            max_entries,
            max_age_ms,
            default_ttl_ms: None,
            priority,
        }
    }

    pub fn with_default_ttl(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = Some(ttl_ms);
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(100, 5 * 60 * 1000, StorePriority::Normal)
    }
}

// == Invalidation ==
/// Filter selecting the entries removed by an invalidation.
pub enum Invalidation<'a> {
    /// Entries whose age is at least this many milliseconds
    MaxAge(u64),
    /// A single key
    Key(&'a str),
    /// Every key starting with the prefix
    Prefix(&'a str),
    /// Arbitrary predicate over the entry
    Matching(&'a dyn Fn(&CacheEntry) -> bool),
    /// Everything in the store
    All,
}

impl Invalidation<'_> {
    fn matches(&self, entry: &CacheEntry, now: u64) -> bool {
        match self {
            Invalidation::MaxAge(max_age) => entry.age_ms(now) >= *max_age,
            Invalidation::Key(key) => entry.key == *key,
            Invalidation::Prefix(prefix) => entry.key.starts_with(prefix),
            Invalidation::Matching(predicate) => predicate(entry),
            Invalidation::All => true,
        }
    }
}

// == Removed ==
/// What a removal pass took out of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removed {
    pub entries: usize,
    pub bytes: usize,
}

impl std::ops::AddAssign for Removed {
    fn add_assign(&mut self, other: Self) {
        self.entries += other.entries;
        self.bytes += other.bytes;
    }
}

// == Cache Store ==
/// A named cache namespace with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore {
    name: String,
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    counters: StoreCounters,
    config: StoreConfig,
    /// Sum of `size_bytes` over `entries`
    memory_usage: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store. A zero capacity is raised to one.
    pub fn new(name: impl Into<String>, mut config: StoreConfig) -> Self {
        config.max_entries = config.max_entries.max(1);
        Self {
            name: name.into(),
            entries: HashMap::new(),
            lru: LruTracker::new(),
            counters: StoreCounters::new(),
            config,
            memory_usage: 0,
        }
    }

    // == Get ==
    /// Looks up `key`, counting a hit or a miss.
    ///
    /// A stale entry is removed on the spot and counted as a miss.
    pub fn get(&mut self, key: &str, now: u64) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.counters.record_miss();
                return None;
            }
        };

        if expired {
            self.take(key);
            self.counters.record_expiration();
            self.counters.record_miss();
            return None;
        }

        self.counters.record_hit();
        self.lru.touch(key);
        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        Some(entry.value.clone())
    }

    /// Reads an entry without touching counters or recency.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Set ==
    /// Inserts or replaces an entry, then evicts least recently used entries
    /// until the store is back within `max_entries`.
    ///
    /// Returns the number of evicted entries.
    pub fn set(&mut self, entry: CacheEntry) -> usize {
        let key = entry.key.clone();
        self.memory_usage += entry.size_bytes;
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            self.memory_usage -= previous.size_bytes;
        }
        self.lru.touch(&key);

        let mut evicted = 0;
        while self.entries.len() > self.config.max_entries {
            let Some(oldest) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(removed) = self.entries.remove(&oldest) {
                self.memory_usage -= removed.size_bytes;
                self.counters.record_eviction();
                evicted += 1;
            }
        }
        evicted
    }

    // == Remove ==
    /// Removes one entry; unknown keys return None.
    pub fn take(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.memory_usage -= entry.size_bytes;
        Some(entry)
    }

    // == Invalidate ==
    /// Removes every entry matching `filter`.
    pub fn invalidate(&mut self, filter: &Invalidation<'_>, now: u64) -> Removed {
        if let Invalidation::Key(key) = filter {
            return self
                .take(key)
                .map(|e| Removed {
                    entries: 1,
                    bytes: e.size_bytes,
                })
                .unwrap_or_default();
        }
        self.remove_where(|entry| filter.matches(entry, now))
    }

    /// Drops entries whose TTL elapsed.
    pub fn remove_expired(&mut self, now: u64) -> Removed {
        let removed = self.remove_where(|entry| entry.is_expired_at(now));
        self.counters.expirations += removed.entries as u64;
        removed
    }

    /// Drops entries older than the store's `max_age_ms`.
    pub fn remove_stale(&mut self, now: u64) -> Removed {
        let max_age = self.config.max_age_ms;
        self.remove_where(|entry| entry.age_ms(now) > max_age)
    }

    /// Drops unpinned entries not accessed within `window_ms`.
    pub fn remove_idle(&mut self, window_ms: u64, now: u64) -> Removed {
        self.remove_where(|entry| !entry.high_priority && entry.idle_ms(now) > window_ms)
    }

    /// Evicts unpinned entries in LRU order until at most `target` remain.
    ///
    /// Pinned entries are skipped, so the store may stay above `target`.
    pub fn trim_to(&mut self, target: usize) -> Removed {
        let excess = self.entries.len().saturating_sub(target);
        if excess == 0 {
            return Removed::default();
        }
        let victims: Vec<String> = self
            .lru
            .iter_oldest_first()
            .filter(|key| {
                self.entries
                    .get(*key)
                    .map(|entry| !entry.high_priority)
                    .unwrap_or(false)
            })
            .take(excess)
            .map(str::to_string)
            .collect();
        self.remove_keys(victims)
    }

    fn remove_where(&mut self, predicate: impl Fn(&CacheEntry) -> bool) -> Removed {
        let keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| predicate(entry))
            .map(|entry| entry.key.clone())
            .collect();
        self.remove_keys(keys)
    }

    fn remove_keys(&mut self, keys: Vec<String>) -> Removed {
        let mut removed = Removed::default();
        for key in keys {
            if let Some(entry) = self.take(&key) {
                removed.entries += 1;
                removed.bytes += entry.size_bytes;
            }
        }
        removed
    }

    /// Drops every entry but keeps the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.memory_usage = 0;
    }

    // == Stats ==
    /// Returns a snapshot of this store.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            hit_rate: self.counters.hit_rate(),
            hits: self.counters.hits,
            misses: self.counters.misses,
            evictions: self.counters.evictions,
            size: self.entries.len(),
            max_entries: self.config.max_entries,
            memory_usage: self.memory_usage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn counters(&self) -> &StoreCounters {
        &self.counters
    }

    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn put(store: &mut CacheStore, key: &str, size: usize, ttl: Option<u64>, now: u64) -> usize {
        store.set(CacheEntry::new(key.to_string(), json!(key), ttl, size, now))
    }

    fn small_store(max_entries: usize) -> CacheStore {
        CacheStore::new("api", StoreConfig::new(max_entries, 60_000, StorePriority::Normal))
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = small_store(10);
        put(&mut store, "a", 5, None, 0);

        assert_eq!(store.get("a", 1), Some(json!("a")));
        assert_eq!(store.counters().hits, 1);
        assert_eq!(store.memory_usage(), 5);
    }

    #[test]
    fn test_store_get_missing_counts_miss() {
        let mut store = small_store(10);
        assert_eq!(store.get("nope", 0), None);
        assert_eq!(store.counters().misses, 1);
    }

    #[test]
    fn test_store_lazy_expiry() {
        let mut store = small_store(10);
        put(&mut store, "a", 5, Some(100), 0);

        assert_eq!(store.get("a", 101), None);
        assert!(!store.contains("a"));
        assert_eq!(store.memory_usage(), 0);
        assert_eq!(store.counters().misses, 1);
        assert_eq!(store.counters().expirations, 1);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = small_store(2);
        put(&mut store, "a", 1, None, 0);
        put(&mut store, "b", 1, None, 0);
        let evicted = put(&mut store, "c", 1, None, 0);

        assert_eq!(evicted, 1);
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert!(store.contains("c"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = small_store(3);
        put(&mut store, "a", 1, None, 0);
        put(&mut store, "b", 1, None, 0);
        put(&mut store, "c", 1, None, 0);
        store.get("a", 1);

        put(&mut store, "d", 1, None, 2);

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
    }

    #[test]
    fn test_store_overwrite_adjusts_memory() {
        let mut store = small_store(10);
        put(&mut store, "a", 10, None, 0);
        put(&mut store, "a", 4, None, 1);

        assert_eq!(store.len(), 1);
        assert_eq!(store.memory_usage(), 4);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let store = CacheStore::new("x", StoreConfig::new(0, 1, StorePriority::Low));
        assert_eq!(store.config().max_entries, 1);
    }

    #[test]
    fn test_invalidate_max_age_zero_clears() {
        let mut store = small_store(10);
        put(&mut store, "a", 1, None, 100);
        put(&mut store, "b", 1, None, 100);

        let removed = store.invalidate(&Invalidation::MaxAge(0), 100);
        assert_eq!(removed.entries, 2);
        assert!(store.is_empty());
        assert_eq!(store.memory_usage(), 0);
    }

    #[test]
    fn test_invalidate_prefix_and_predicate() {
        let mut store = small_store(10);
        put(&mut store, "user:1", 1, None, 0);
        put(&mut store, "user:2", 1, None, 0);
        put(&mut store, "board", 50, None, 0);

        assert_eq!(store.invalidate(&Invalidation::Prefix("user:"), 0).entries, 2);

        let big = |e: &CacheEntry| e.size_bytes > 10;
        assert_eq!(store.invalidate(&Invalidation::Matching(&big), 0).entries, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalidate_missing_key_is_noop() {
        let mut store = small_store(10);
        assert_eq!(store.invalidate(&Invalidation::Key("ghost"), 0), Removed::default());
    }

    #[test]
    fn test_remove_stale_and_expired() {
        let mut store = small_store(10);
        put(&mut store, "old", 1, None, 0);
        put(&mut store, "ttl", 1, Some(10), 59_990);
        put(&mut store, "fresh", 1, None, 60_000);

        assert_eq!(store.remove_expired(60_001).entries, 1);
        assert_eq!(store.remove_stale(60_001).entries, 1);
        assert!(store.contains("fresh"));
    }

    #[test]
    fn test_trim_skips_pinned() {
        let mut store = small_store(10);
        let mut pinned = CacheEntry::new("p".into(), json!(1), None, 1, 0);
        pinned.high_priority = true;
        store.set(pinned);
        put(&mut store, "a", 1, None, 0);
        put(&mut store, "b", 1, None, 0);

        let removed = store.trim_to(1);
        assert_eq!(removed.entries, 2);
        assert!(store.contains("p"));
    }

    #[test]
    fn test_remove_idle_keeps_recent_and_pinned() {
        let mut store = small_store(10);
        put(&mut store, "idle", 1, None, 0);
        put(&mut store, "recent", 1, None, 900);
        let mut pinned = CacheEntry::new("p".into(), json!(1), None, 1, 0);
        pinned.high_priority = true;
        store.set(pinned);

        let removed = store.remove_idle(500, 1_000);
        assert_eq!(removed.entries, 1);
        assert!(!store.contains("idle"));
        assert!(store.contains("recent"));
        assert!(store.contains("p"));
    }
}
