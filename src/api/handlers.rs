//! API Handlers
//!
//! HTTP request handlers for the cache engine and the performance monitor.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::{CacheStatsSnapshot, CleanupReport, PerformanceMetricRecord, SharedEngine};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    GetResponse, HealthResponse, InvalidateRequest, InvalidateResponse, RecordMetricRequest,
    RecordMetricResponse, SetRequest, SetResponse,
};
use crate::monitor::{BrowserSignal, PerformanceMonitor, PerformanceReport, PerformanceStatus};

/// Application state shared across all handlers.
///
/// The engine is the same instance the monitor drives.
#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
    pub monitor: Arc<PerformanceMonitor>,
}

impl AppState {
    pub fn new(monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            engine: monitor.engine(),
            monitor,
        }
    }

    /// Builds the engine and an unstarted monitor from configuration.
    pub fn from_config(config: &Config) -> Self {
        let engine = crate::cache::CacheEngine::shared(config.engine_config());
        let monitor = PerformanceMonitor::new(
            Some(engine),
            config.thresholds(),
            config.capabilities(),
            config.monitor_settings(),
        );
        Self::new(monitor)
    }
}

// == Cache ==
/// Handler for PUT /cache/:store
pub async fn set_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let options = req.options();
    let mut engine = state.engine.write().await;
    engine.set(&store, &req.key, req.value, options)?;

    Ok(Json(SetResponse::new(store, req.key)))
}

/// Handler for GET /cache/:store/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    // Write lock: reads update recency and counters
    let mut engine = state.engine.write().await;
    match engine.get(&store, &key)? {
        Some(value) => Ok(Json(GetResponse::new(store, key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:store/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
) -> Result<Json<InvalidateResponse>> {
    let mut engine = state.engine.write().await;
    let removed = engine.invalidate(&store, InvalidateRequest::Key { key }.filter())?;

    Ok(Json(InvalidateResponse::new(store, removed)))
}

/// Handler for POST /invalidate/:store
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let mut engine = state.engine.write().await;
    let removed = engine.invalidate(&store, req.filter())?;

    Ok(Json(InvalidateResponse::new(store, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CacheStatsSnapshot>> {
    let engine = state.engine.read().await;
    Ok(Json(engine.get_cache_stats()?))
}

/// Handler for POST /cleanup/memory
pub async fn memory_cleanup_handler(
    State(state): State<AppState>,
) -> Result<Json<CleanupReport>> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.perform_memory_cleanup()?))
}

/// Handler for POST /cleanup/aggressive
pub async fn aggressive_cleanup_handler(
    State(state): State<AppState>,
) -> Result<Json<CleanupReport>> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.perform_aggressive_cleanup()?))
}

// == Metrics ==
/// Handler for POST /metrics
pub async fn record_metric_handler(
    State(state): State<AppState>,
    Json(req): Json<RecordMetricRequest>,
) -> Result<Json<RecordMetricResponse>> {
    let mut engine = state.engine.write().await;
    engine.record_performance_metric(&req.category, req.payload)?;

    Ok(Json(RecordMetricResponse::new(req.category)))
}

/// Handler for GET /metrics/:category
pub async fn metrics_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<PerformanceMetricRecord>>> {
    let engine = state.engine.read().await;
    Ok(Json(engine.metrics(&category)?))
}

// == Monitor ==
/// Handler for POST /signals
///
/// Feeds one page signal to the monitor. Always accepted; signals the
/// monitor cannot use are dropped there.
pub async fn signal_handler(
    State(state): State<AppState>,
    Json(signal): Json<BrowserSignal>,
) -> StatusCode {
    state.monitor.handle_signal(signal).await;
    StatusCode::ACCEPTED
}

/// Handler for GET /performance/status
pub async fn status_handler(State(state): State<AppState>) -> Json<PerformanceStatus> {
    Json(state.monitor.get_performance_status().await)
}

/// Handler for GET /performance/report
pub async fn report_handler(State(state): State<AppState>) -> Json<PerformanceReport> {
    Json(state.monitor.generate_performance_report().await)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let initialized = state.engine.read().await.is_initialized();
    Json(HealthResponse::new(initialized, state.monitor.phase()))
}
