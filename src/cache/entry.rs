//! Cache Entry Module
//!
//! Defines a single cached payload together with its bookkeeping metadata.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

// == Set Options ==
/// Per-call options for [`crate::cache::CacheEngine::set`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Expiry in milliseconds; falls back to the store's default TTL
    pub ttl_ms: Option<u64>,
    /// Caller-supplied footprint; estimated from the payload when absent
    pub size_bytes: Option<usize>,
    /// Pinned entries survive aggressive cleanup
    pub high_priority: bool,
}

impl SetOptions {
    pub fn with_ttl(ttl_ms: u64) -> Self {
        Self {
            ttl_ms: Some(ttl_ms),
            ..Self::default()
        }
    }

    pub fn sized(mut self, size_bytes: usize) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.high_priority = true;
        self
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    /// Key, unique within its store
    pub key: String,
    /// The stored payload
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last read or write (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Estimated memory footprint
    pub size_bytes: usize,
    /// Time-to-live in milliseconds, None = no expiration
    pub ttl_ms: Option<u64>,
    /// Excluded from aggressive cleanup
    pub high_priority: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with `now`.
    pub fn new(key: String, value: Value, ttl_ms: Option<u64>, size_bytes: usize, now: u64) -> Self {
        Self {
            key,
            value,
            created_at: now,
            last_accessed_at: now,
            size_bytes,
            ttl_ms,
            high_priority: false,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now`.
    ///
    /// An entry is stale once `now - created_at > ttl_ms`; the instant the
    /// TTL has exactly elapsed is still a hit.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.ttl_ms {
            Some(ttl) => now.saturating_sub(self.created_at) > ttl,
            None => false,
        }
    }

    /// Milliseconds since creation.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Milliseconds since the last read or write.
    pub fn idle_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_accessed_at)
    }

    /// Refreshes the access timestamp.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed_at = now;
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining_ms(&self, now: u64) -> Option<u64> {
        self.ttl_ms
            .map(|ttl| (self.created_at + ttl).saturating_sub(now))
    }
}

// == Utility Functions ==
/// Estimates the in-memory footprint of a payload stored under `key`.
pub fn estimate_size(key: &str, value: &Value) -> usize {
    key.len() + serialized_len(value)
}

/// Length of the compact JSON encoding of `value`.
pub fn serialized_len(value: &Value) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
