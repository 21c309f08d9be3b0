//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::monitor::MonitorPhase;

/// Response body for `GET /cache/:store/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub store: String,
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(store: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            store: store.into(),
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /cache/:store`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    pub store: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(store: impl Into<String>, key: impl Into<String>) -> Self {
        let (store, key) = (store.into(), key.into());
        Self {
            message: format!("Key '{}' set in '{}'", key, store),
            store,
            key,
        }
    }
}

/// Response body for `DELETE /cache/:store/:key` and
/// `POST /invalidate/:store`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub store: String,
    /// Entries removed; zero when nothing matched
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(store: impl Into<String>, removed: usize) -> Self {
        Self {
            store: store.into(),
            removed,
        }
    }
}

/// Response body for `POST /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct RecordMetricResponse {
    pub message: String,
    pub category: String,
}

impl RecordMetricResponse {
    pub fn new(category: impl Into<String>) -> Self {
        let category = category.into();
        Self {
            message: format!("Metric recorded in '{}'", category),
            category,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" while the engine is usable, "destroyed" afterwards
    pub status: String,
    pub monitor: MonitorPhase,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(engine_initialized: bool, monitor: MonitorPhase) -> Self {
        let status = if engine_initialized { "healthy" } else { "destroyed" };
        Self {
            status: status.to_string(),
            monitor,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
