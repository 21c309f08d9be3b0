//! Performance Metric Buffer
//!
//! Rolling per-category record buffers bounded by count and age.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::CacheError;

/// Default number of records kept per category
pub const DEFAULT_MAX_PER_CATEGORY: usize = 100;

/// Default maximum record age (1 hour)
pub const DEFAULT_MAX_AGE_MS: u64 = 60 * 60 * 1000;

// == Metric Record ==
/// One recorded observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetricRecord {
    /// Global call-order sequence, shared by all categories
    pub seq: u64,
    pub category: String,
    pub payload: Value,
    /// Unix milliseconds
    pub timestamp: u64,
}

// == Metric Buffer ==
#[derive(Debug)]
pub struct MetricBuffer {
    buffers: BTreeMap<String, VecDeque<PerformanceMetricRecord>>,
    max_per_category: usize,
    max_age_ms: u64,
    next_seq: u64,
    overflow_count: u64,
}

impl MetricBuffer {
    pub fn new(max_per_category: usize, max_age_ms: u64) -> Self {
        Self {
            buffers: BTreeMap::new(),
            max_per_category: max_per_category.max(1),
            max_age_ms,
            next_seq: 0,
            overflow_count: 0,
        }
    }

    /// Appends a record and prunes its category.
    ///
    /// Returns the number of records pruned to stay within bounds.
    pub fn record(&mut self, category: &str, payload: Value, now: u64) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;

        let buffer = self.buffers.entry(category.to_string()).or_default();
        buffer.push_back(PerformanceMetricRecord {
            seq,
            category: category.to_string(),
            payload,
            timestamp: now,
        });

        let pruned = Self::prune(buffer, self.max_per_category, self.max_age_ms, now);
        if pruned > 0 {
            self.overflow_count += 1;
            let overflow = CacheError::MetricOverflow {
                category: category.to_string(),
                pruned,
            };
            debug!("{}", overflow);
        }
        pruned
    }

    fn prune(
        buffer: &mut VecDeque<PerformanceMetricRecord>,
        max_len: usize,
        max_age_ms: u64,
        now: u64,
    ) -> usize {
        let before = buffer.len();
        while buffer
            .front()
            .is_some_and(|r| now.saturating_sub(r.timestamp) > max_age_ms)
        {
            buffer.pop_front();
        }
        while buffer.len() > max_len {
            buffer.pop_front();
        }
        before - buffer.len()
    }

    /// Applies the age bound to every category.
    pub fn prune_all(&mut self, now: u64) -> usize {
        let (max_len, max_age) = (self.max_per_category, self.max_age_ms);
        let pruned = self
            .buffers
            .values_mut()
            .map(|buffer| Self::prune(buffer, max_len, max_age, now))
            .sum();
        self.buffers.retain(|_, buffer| !buffer.is_empty());
        pruned
    }

    /// Records of one category, oldest first.
    pub fn records(&self, category: &str) -> Vec<PerformanceMetricRecord> {
        self.buffers
            .get(category)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, category: &str) -> Option<&PerformanceMetricRecord> {
        self.buffers.get(category).and_then(|buffer| buffer.back())
    }

    pub fn categories(&self) -> Vec<String> {
        self.buffers.keys().cloned().collect()
    }

    /// Total records across categories.
    pub fn len(&self) -> usize {
        self.buffers.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many `record` calls had to prune.
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

impl Default for MetricBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_CATEGORY, DEFAULT_MAX_AGE_MS)
    }
}
