//! Error types for the cache engine and monitoring layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache engine, the monitor and the HTTP surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Malformed `set` call (empty key, null value, oversized payload)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation on a destroyed or never-initialized engine
    #[error("Cache engine not initialized: {0}")]
    NotInitialized(String),

    /// A browser capability needed by an observer is absent
    #[error("Observer unsupported: {0}")]
    ObserverUnsupported(String),

    /// A metric buffer dropped old records to stay within its bounds
    #[error("Metric buffer overflow in '{category}': pruned {pruned} record(s)")]
    MetricOverflow { category: String, pruned: usize },

    /// Lookup missed (only surfaced by the HTTP layer)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Shorthand for the error every call on a destroyed engine returns.
    pub fn destroyed(operation: &str) -> Self {
        CacheError::NotInitialized(format!("'{}' called after destroy", operation))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::NotInitialized(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::ObserverUnsupported(_) => StatusCode::NOT_IMPLEMENTED,
            CacheError::MetricOverflow { .. } | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
