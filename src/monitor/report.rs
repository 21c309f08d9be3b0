//! Status, reports and recommendations

use serde::Serialize;

use crate::cache::CacheStatsSnapshot;
use crate::monitor::network::NetworkSnapshot;
use crate::monitor::signals::MemorySample;
use crate::monitor::{MonitorPhase, Thresholds};

// == Performance Stats ==
/// Everything the monitor has observed outside the cache itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    #[serde(flatten)]
    pub network: NetworkSnapshot,
    pub memory_pressure: Option<f64>,
    pub last_memory_sample: Option<MemorySample>,
    pub dom_content_loaded_ms: Option<f64>,
    pub page_load_ms: Option<f64>,
    pub first_paint_ms: Option<f64>,
    pub connection_type: Option<String>,
    pub lazy_observed: usize,
    pub lazy_loaded: usize,
    pub pending_frame_work: usize,
}

// == Recommendation ==
/// A violated threshold, described for humans. Advisory only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// `store:<name>`, `memory`, or `network`
    pub scope: String,
    pub threshold: &'static str,
    pub observed: f64,
    pub limit: f64,
    pub message: String,
}

/// Re-runs every threshold comparison and describes each violation.
///
/// Stores that have never been read are skipped by the hit-rate rule.
pub fn recommendations(
    cache: &CacheStatsSnapshot,
    performance: &PerformanceStats,
    thresholds: &Thresholds,
    memory_pressure_threshold: f64,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for (name, store) in &cache.stores {
        if store.lookups() == 0 || !thresholds.hit_rate_violated(store.hit_rate) {
            continue;
        }
        let gap = (thresholds.cache_hit_rate - store.hit_rate) * 100.0;
        out.push(Recommendation {
            scope: format!("store:{}", name),
            threshold: "cache_hit_rate",
            observed: store.hit_rate,
            limit: thresholds.cache_hit_rate,
            message: format!(
                "Store '{}' hit rate {:.1}% is {:.1} points below the {:.1}% target; \
                 review its TTLs or warm it on load",
                name,
                store.hit_rate * 100.0,
                gap,
                thresholds.cache_hit_rate * 100.0
            ),
        });
    }

    if thresholds.memory_violated(cache.total_memory_usage) {
        out.push(Recommendation {
            scope: "memory".to_string(),
            threshold: "memory_usage",
            observed: cache.total_memory_usage as f64,
            limit: thresholds.memory_usage as f64,
            message: format!(
                "Cache holds {} bytes, {} over the {} byte limit",
                cache.total_memory_usage,
                cache.total_memory_usage - thresholds.memory_usage,
                thresholds.memory_usage
            ),
        });
    }

    if let Some(pressure) = performance.memory_pressure {
        if pressure >= memory_pressure_threshold {
            out.push(Recommendation {
                scope: "memory".to_string(),
                threshold: "memory_pressure",
                observed: pressure,
                limit: memory_pressure_threshold,
                message: format!(
                    "Heap pressure {:.0}% is at or above {:.0}%",
                    pressure * 100.0,
                    memory_pressure_threshold * 100.0
                ),
            });
        }
    }

    let network = &performance.network;
    if thresholds.response_time_violated(network.avg_response_time_ms) {
        out.push(Recommendation {
            scope: "network".to_string(),
            threshold: "avg_response_time",
            observed: network.avg_response_time_ms,
            limit: thresholds.avg_response_time_ms,
            message: format!(
                "Average response time {:.0} ms exceeds {:.0} ms by {:.0} ms",
                network.avg_response_time_ms,
                thresholds.avg_response_time_ms,
                network.avg_response_time_ms - thresholds.avg_response_time_ms
            ),
        });
    }

    if thresholds.error_rate_violated(network.error_rate) {
        out.push(Recommendation {
            scope: "network".to_string(),
            threshold: "error_rate",
            observed: network.error_rate,
            limit: thresholds.error_rate,
            message: format!(
                "Request error rate {:.1}% exceeds {:.1}%",
                network.error_rate * 100.0,
                thresholds.error_rate * 100.0
            ),
        });
    }

    out
}

// == Status ==
/// Health-check answer for the UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStatus {
    pub healthy: bool,
    pub phase: MonitorPhase,
    pub cache_stats: CacheStatsSnapshot,
    pub performance_stats: PerformanceStats,
    pub recommendations: Vec<Recommendation>,
}

// == Report ==
/// Periodic snapshot, also recorded as a `performance_report` metric.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    /// RFC 3339
    pub generated_at: String,
    pub phase: MonitorPhase,
    pub cache_stats: CacheStatsSnapshot,
    pub performance_stats: PerformanceStats,
    pub thresholds: Thresholds,
    pub recommendations: Vec<Recommendation>,
    pub degraded_observers: Vec<String>,
}
