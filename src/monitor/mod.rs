//! Performance monitoring
//!
//! Observes page signals, compares them and the cache statistics against a
//! threshold set, and drives cleanup on the cache engine.

mod capabilities;
mod integration;
pub mod network;
mod phase;
mod report;
mod settings;
mod signals;
mod thresholds;

pub use capabilities::Capabilities;
pub use integration::{OptimizationOutcome, PerformanceMonitor, TargetedInvalidation};
pub use network::{NetworkSnapshot, NetworkStats, RequestObservation};
pub use phase::MonitorPhase;
pub use report::{recommendations, PerformanceReport, PerformanceStats, PerformanceStatus, Recommendation};
pub use settings::MonitorSettings;
pub use signals::{BrowserSignal, MemorySample};
pub use thresholds::{Thresholds, DEFAULT_MEMORY_USAGE_BYTES};
