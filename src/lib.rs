//! Perf Cache - multi-store cache engine with performance monitoring
//!
//! Named cache stores with TTL expiry and LRU eviction, a bounded buffer of
//! performance metrics, and a monitor that drives cleanup from observed
//! cache, memory and network signals.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod optimizer;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheEngine, SharedEngine};
pub use config::Config;
pub use error::{CacheError, Result};
pub use monitor::PerformanceMonitor;
pub use tasks::spawn_cleanup_task;
