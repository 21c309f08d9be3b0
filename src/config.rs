//! Configuration Module
//!
//! Loads server, engine and monitor configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EngineConfig;
use crate::monitor::{Capabilities, MonitorSettings, Thresholds, DEFAULT_MEMORY_USAGE_BYTES};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// TTL sweep interval in milliseconds
    pub cleanup_interval_ms: u64,

    /// Minimum acceptable per-store hit rate
    pub hit_rate_threshold: f64,
    /// Maximum acceptable average response time in milliseconds
    pub response_time_threshold_ms: f64,
    /// Maximum cache footprint in bytes
    pub memory_usage_threshold: usize,
    /// Maximum acceptable request failure rate
    pub error_rate_threshold: f64,

    /// Threshold poll period in seconds
    pub optimization_interval: u64,
    /// Report period in seconds
    pub report_interval: u64,
    /// Memory sampling period in seconds
    pub memory_sample_interval: u64,
    pub memory_pressure_threshold: f64,
    pub store_size_ceiling: usize,
    pub short_window_ms: u64,

    pub metric_max_per_category: usize,
    pub metric_max_age_ms: u64,

    pub has_performance_observer: bool,
    pub has_memory_api: bool,
    pub has_connection_api: bool,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL_MS` - TTL sweep frequency (default: 1000)
    /// - `HIT_RATE_THRESHOLD` (0.8), `RESPONSE_TIME_THRESHOLD_MS` (1000),
    ///   `MEMORY_USAGE_THRESHOLD` (50 MiB), `ERROR_RATE_THRESHOLD` (0.05)
    /// - `OPTIMIZATION_INTERVAL` (120), `REPORT_INTERVAL` (300),
    ///   `MEMORY_SAMPLE_INTERVAL` (30), all in seconds
    /// - `MEMORY_PRESSURE_THRESHOLD` (0.8), `STORE_SIZE_CEILING` (50),
    ///   `SHORT_WINDOW_MS` (60000)
    /// - `METRIC_MAX_PER_CATEGORY` (100), `METRIC_MAX_AGE_MS` (3600000)
    /// - `CAP_PERFORMANCE_OBSERVER`, `CAP_MEMORY_API`, `CAP_CONNECTION_API`
    ///   (all true)
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", d.server_port),
            cleanup_interval_ms: env_or("CLEANUP_INTERVAL_MS", d.cleanup_interval_ms),
            hit_rate_threshold: env_or("HIT_RATE_THRESHOLD", d.hit_rate_threshold),
            response_time_threshold_ms: env_or(
                "RESPONSE_TIME_THRESHOLD_MS",
                d.response_time_threshold_ms,
            ),
            memory_usage_threshold: env_or("MEMORY_USAGE_THRESHOLD", d.memory_usage_threshold),
            error_rate_threshold: env_or("ERROR_RATE_THRESHOLD", d.error_rate_threshold),
            optimization_interval: env_or("OPTIMIZATION_INTERVAL", d.optimization_interval),
            report_interval: env_or("REPORT_INTERVAL", d.report_interval),
            memory_sample_interval: env_or("MEMORY_SAMPLE_INTERVAL", d.memory_sample_interval),
            memory_pressure_threshold: env_or(
                "MEMORY_PRESSURE_THRESHOLD",
                d.memory_pressure_threshold,
            ),
            store_size_ceiling: env_or("STORE_SIZE_CEILING", d.store_size_ceiling),
            short_window_ms: env_or("SHORT_WINDOW_MS", d.short_window_ms),
            metric_max_per_category: env_or("METRIC_MAX_PER_CATEGORY", d.metric_max_per_category),
            metric_max_age_ms: env_or("METRIC_MAX_AGE_MS", d.metric_max_age_ms),
            has_performance_observer: env_or(
                "CAP_PERFORMANCE_OBSERVER",
                d.has_performance_observer,
            ),
            has_memory_api: env_or("CAP_MEMORY_API", d.has_memory_api),
            has_connection_api: env_or("CAP_CONNECTION_API", d.has_connection_api),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            metric_max_per_category: self.metric_max_per_category,
            metric_max_age_ms: self.metric_max_age_ms,
            ..EngineConfig::default()
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            cache_hit_rate: self.hit_rate_threshold,
            avg_response_time_ms: self.response_time_threshold_ms,
            memory_usage: self.memory_usage_threshold,
            error_rate: self.error_rate_threshold,
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            optimization_interval: Duration::from_secs(self.optimization_interval),
            report_interval: Duration::from_secs(self.report_interval),
            memory_sample_interval: Duration::from_secs(self.memory_sample_interval),
            ttl_sweep_interval: Duration::from_millis(self.cleanup_interval_ms),
            memory_pressure_threshold: self.memory_pressure_threshold,
            store_size_ceiling: self.store_size_ceiling,
            short_window_ms: self.short_window_ms,
            ..MonitorSettings::default()
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_performance_observer: self.has_performance_observer,
            has_memory_api: self.has_memory_api,
            has_connection_api: self.has_connection_api,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        let settings = MonitorSettings::default();
        let engine = EngineConfig::default();
        Self {
            server_port: 3000,
            cleanup_interval_ms: settings.ttl_sweep_interval.as_millis() as u64,
            hit_rate_threshold: thresholds.cache_hit_rate,
            response_time_threshold_ms: thresholds.avg_response_time_ms,
            memory_usage_threshold: DEFAULT_MEMORY_USAGE_BYTES,
            error_rate_threshold: thresholds.error_rate,
            optimization_interval: settings.optimization_interval.as_secs(),
            report_interval: settings.report_interval.as_secs(),
            memory_sample_interval: settings.memory_sample_interval.as_secs(),
            memory_pressure_threshold: settings.memory_pressure_threshold,
            store_size_ceiling: settings.store_size_ceiling,
            short_window_ms: settings.short_window_ms,
            metric_max_per_category: engine.metric_max_per_category,
            metric_max_age_ms: engine.metric_max_age_ms,
            has_performance_observer: true,
            has_memory_api: true,
            has_connection_api: true,
        }
    }
}
