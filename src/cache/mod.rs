//! Cache Module
//!
//! Multi-store caching with TTL expiration, LRU eviction, memory accounting
//! and a rolling performance metric buffer.

mod engine;
mod entry;
mod lru;
mod metrics;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::{CacheEngine, CleanupLevel, CleanupReport, EngineConfig, SharedEngine};
pub use entry::{current_timestamp_ms, CacheEntry, SetOptions};
pub use lru::LruTracker;
pub use metrics::{MetricBuffer, PerformanceMetricRecord};
pub use stats::{CacheStatsSnapshot, StoreCounters, StoreStats};
pub use store::{CacheStore, Invalidation, Removed, StoreConfig, StorePriority};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed serialized value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
