//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    aggressive_cleanup_handler, delete_handler, get_handler, health_handler, invalidate_handler,
    memory_cleanup_handler, metrics_handler, record_metric_handler, report_handler, set_handler,
    signal_handler, stats_handler, status_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache/:store` - Store a value
/// - `GET /cache/:store/:key` - Retrieve a value
/// - `DELETE /cache/:store/:key` - Invalidate one key
/// - `POST /invalidate/:store` - Invalidate by age, key, prefix or all
/// - `GET /stats` - Cache statistics
/// - `POST /cleanup/memory`, `POST /cleanup/aggressive` - Manual cleanup
/// - `POST /metrics`, `GET /metrics/:category` - Performance metric records
/// - `POST /signals` - Page signals for the monitor
/// - `GET /performance/status`, `GET /performance/report`
/// - `GET /health`
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache/:store", put(set_handler))
        .route("/cache/:store/:key", get(get_handler).delete(delete_handler))
        .route("/invalidate/:store", post(invalidate_handler))
        .route("/stats", get(stats_handler))
        .route("/cleanup/memory", post(memory_cleanup_handler))
        .route("/cleanup/aggressive", post(aggressive_cleanup_handler))
        .route("/metrics", post(record_metric_handler))
        .route("/metrics/:category", get(metrics_handler))
        .route("/signals", post(signal_handler))
        .route("/performance/status", get(status_handler))
        .route("/performance/report", get(report_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
