//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies. Argument checks
//! live in the engine; these types only map JSON onto engine calls.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{Invalidation, SetOptions};

/// Request body for `PUT /cache/:store`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value except `null`
    pub value: Value,
    /// Optional TTL in milliseconds (store default if absent)
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Caller-supplied footprint, estimated from the JSON if absent
    #[serde(default)]
    pub size_bytes: Option<usize>,
    /// Pinned entries survive aggressive cleanup
    #[serde(default)]
    pub high_priority: bool,
}

impl SetRequest {
    pub fn options(&self) -> SetOptions {
        SetOptions {
            ttl_ms: self.ttl_ms,
            size_bytes: self.size_bytes,
            high_priority: self.high_priority,
        }
    }
}

/// Request body for `POST /invalidate/:store`
///
/// ```json
/// {"by": "max_age", "max_age_ms": 60000}
/// {"by": "prefix", "prefix": "leaderboard:"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum InvalidateRequest {
    MaxAge { max_age_ms: u64 },
    Key { key: String },
    Prefix { prefix: String },
    All,
}

impl InvalidateRequest {
    pub fn filter(&self) -> Invalidation<'_> {
        match self {
            InvalidateRequest::MaxAge { max_age_ms } => Invalidation::MaxAge(*max_age_ms),
            InvalidateRequest::Key { key } => Invalidation::Key(key),
            InvalidateRequest::Prefix { prefix } => Invalidation::Prefix(prefix),
            InvalidateRequest::All => Invalidation::All,
        }
    }
}

/// Request body for `POST /metrics`
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMetricRequest {
    pub category: String,
    #[serde(default)]
    pub payload: Value,
}
