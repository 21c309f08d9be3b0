//! Threshold set
//!
//! Process-wide limits compared against cache and network statistics. Built
//! once at startup and never mutated afterwards.

use serde::Serialize;

/// Default memory ceiling for cached data (50 MB)
pub const DEFAULT_MEMORY_USAGE_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// Minimum acceptable hit rate (0.0 - 1.0)
    pub cache_hit_rate: f64,
    /// Maximum acceptable average response time in milliseconds
    pub avg_response_time_ms: f64,
    /// Maximum bytes held by the cache engine
    pub memory_usage: usize,
    /// Maximum fraction of failed requests
    pub error_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cache_hit_rate: 0.8,
            avg_response_time_ms: 1000.0,
            memory_usage: DEFAULT_MEMORY_USAGE_BYTES,
            error_rate: 0.05,
        }
    }
}

impl Thresholds {
    pub fn hit_rate_violated(&self, hit_rate: f64) -> bool {
        hit_rate < self.cache_hit_rate
    }

    pub fn memory_violated(&self, bytes: usize) -> bool {
        bytes > self.memory_usage
    }

    pub fn response_time_violated(&self, avg_ms: f64) -> bool {
        avg_ms > self.avg_response_time_ms
    }

    pub fn error_rate_violated(&self, rate: f64) -> bool {
        rate > self.error_rate
    }
}
