//! Monitor tuning knobs
//!
//! Defaults mirror the escalation constants the dashboard has always used;
//! all of them can be overridden at construction.

use std::time::Duration;

use crate::optimizer::FRAME_BUDGET;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// Cache threshold polling period (torn down while suspended)
    pub optimization_interval: Duration,
    /// Snapshot report period
    pub report_interval: Duration,
    /// Memory pressure sampling period
    pub memory_sample_interval: Duration,
    /// TTL sweep period
    pub ttl_sweep_interval: Duration,
    /// Frame queue flush period
    pub frame_interval: Duration,
    /// `used / limit` at which an immediate optimization pass runs
    pub memory_pressure_threshold: f64,
    /// Stores at or below this many entries are never invalidated for a
    /// low hit rate
    pub store_size_ceiling: usize,
    /// Age bound of the targeted invalidation for low hit-rate stores
    pub short_window_ms: u64,
    /// Minimum spacing between recorded high-frequency signal metrics
    pub signal_throttle: Duration,
    /// Requests kept for network averages
    pub network_window: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            optimization_interval: Duration::from_secs(120),
            report_interval: Duration::from_secs(300),
            memory_sample_interval: Duration::from_secs(30),
            ttl_sweep_interval: Duration::from_secs(1),
            frame_interval: FRAME_BUDGET,
            memory_pressure_threshold: 0.8,
            store_size_ceiling: 50,
            short_window_ms: 60 * 1000,
            signal_throttle: Duration::from_secs(1),
            network_window: 100,
        }
    }
}
