//! Performance Monitoring Integration
//!
//! Observes page, network and memory signals, compares cache statistics with
//! the threshold set and drives cleanup on the cache engine. Nothing in here
//! returns an error to its caller: failures are logged and the monitor keeps
//! running with whatever signals it still has.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{
    CacheEngine, CacheStatsSnapshot, CleanupReport, EngineConfig, Invalidation, SharedEngine,
};
use crate::error::CacheError;
use crate::monitor::network::{NetworkStats, RequestObservation};
use crate::monitor::report::{recommendations, PerformanceReport, PerformanceStats, PerformanceStatus};
use crate::monitor::signals::{BrowserSignal, MemorySample};
use crate::monitor::{Capabilities, MonitorPhase, MonitorSettings, Thresholds};
use crate::optimizer::{FlushReport, MutationReactor, ThrottledQueue, FRAME_BUDGET};
use crate::tasks::{spawn_cleanup_task, spawn_monitor_task};

// == Optimization Outcome ==
/// Targeted cleanup of one store with a poor hit rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetedInvalidation {
    pub store: String,
    pub hit_rate: f64,
    pub size: usize,
    pub removed: usize,
}

/// What one pass of the threshold loop did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    /// Another pass was already running
    pub skipped: bool,
    pub targeted_invalidations: Vec<TargetedInvalidation>,
    pub memory_cleanup: Option<CleanupReport>,
    pub aggressive_cleanup: Option<CleanupReport>,
    pub memory_after: usize,
    /// False only when aggressive cleanup could not reach the memory limit
    pub within_memory_budget: bool,
}

impl OptimizationOutcome {
    fn skipped() -> Self {
        Self {
            skipped: true,
            within_memory_budget: true,
            ..Self::default()
        }
    }

    /// Whether any cleanup was invoked.
    pub fn intervened(&self) -> bool {
        !self.targeted_invalidations.is_empty()
            || self.memory_cleanup.is_some()
            || self.aggressive_cleanup.is_some()
    }
}

// == Internal State ==
/// Clears the in-progress flag when a pass ends, is cancelled or panics.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct TaskSet {
    threshold_poll: Option<JoinHandle<()>>,
    memory_sampler: Option<JoinHandle<()>>,
    reporter: Option<JoinHandle<()>>,
    ttl_sweep: Option<JoinHandle<()>>,
    frame_driver: Option<JoinHandle<()>>,
}

impl TaskSet {
    fn abort_all(&mut self) -> usize {
        [
            self.threshold_poll.take(),
            self.memory_sampler.take(),
            self.reporter.take(),
            self.ttl_sweep.take(),
            self.frame_driver.take(),
        ]
        .into_iter()
        .flatten()
        .map(|handle| handle.abort())
        .count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct NavigationTimings {
    dom_content_loaded_ms: Option<f64>,
    load_event_ms: Option<f64>,
    first_paint_ms: Option<f64>,
}

struct MonitorState {
    phase: MonitorPhase,
    tasks: TaskSet,
    network: NetworkStats,
    last_memory: Option<MemorySample>,
    navigation: NavigationTimings,
    connection_type: Option<String>,
    degraded: Vec<String>,
    /// Latest payload per high-frequency metric category
    throttle: ThrottledQueue<&'static str, Value>,
}

// == Performance Monitor ==
pub struct PerformanceMonitor {
    engine: SharedEngine,
    thresholds: Thresholds,
    capabilities: Capabilities,
    settings: MonitorSettings,
    state: Mutex<MonitorState>,
    reactor: Mutex<MutationReactor>,
    /// Set while an optimization pass runs
    optimizing: AtomicBool,
}

impl PerformanceMonitor {
    // == Constructor ==
    /// Builds a monitor in `SettingUp`, attaching to `engine` or creating a
    /// fresh one when none is given.
    pub fn new(
        engine: Option<SharedEngine>,
        thresholds: Thresholds,
        capabilities: Capabilities,
        settings: MonitorSettings,
    ) -> Arc<Self> {
        let engine = engine.unwrap_or_else(|| {
            info!("No cache engine supplied, creating one");
            CacheEngine::shared(EngineConfig::default())
        });

        let mut phase = MonitorPhase::Uninitialized;
        if phase.can_transition_to(MonitorPhase::SettingUp) {
            phase = MonitorPhase::SettingUp;
        }

        let state = MonitorState {
            phase,
            tasks: TaskSet::default(),
            network: NetworkStats::new(settings.network_window),
            last_memory: None,
            navigation: NavigationTimings::default(),
            connection_type: None,
            degraded: Vec::new(),
            throttle: ThrottledQueue::new(settings.signal_throttle),
        };

        Arc::new(Self {
            engine,
            thresholds,
            capabilities,
            settings,
            state: Mutex::new(state),
            reactor: Mutex::new(MutationReactor::new()),
            optimizing: AtomicBool::new(false),
        })
    }

    // == Start ==
    /// Registers observers and periodic tasks, then moves to `Active`.
    ///
    /// Missing capabilities are logged once and leave the monitor in degraded
    /// mode. Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if state.phase != MonitorPhase::SettingUp {
            warn!("Monitor start ignored in phase {:?}", state.phase);
            return;
        }

        for observer in self.capabilities.missing() {
            let err = CacheError::ObserverUnsupported(format!("{} observer", observer));
            warn!("{}; continuing in degraded mode", err);
            state.degraded.push(observer.to_string());
        }

        let weak = Arc::downgrade(self);
        state.tasks.threshold_poll = Some(self.spawn_threshold_poll());
        state.tasks.memory_sampler = Some(spawn_monitor_task(
            "memory_sampler",
            weak.clone(),
            self.settings.memory_sample_interval,
            |monitor| async move {
                monitor.sample_memory().await;
            },
        ));
        state.tasks.reporter = Some(spawn_monitor_task(
            "reporter",
            weak.clone(),
            self.settings.report_interval,
            |monitor| async move {
                monitor.generate_performance_report().await;
                monitor.prune_metrics().await;
            },
        ));
        state.tasks.frame_driver = Some(spawn_monitor_task(
            "frame_driver",
            weak,
            self.settings.frame_interval,
            |monitor| async move {
                if monitor.phase().is_running() {
                    monitor.flush_frame();
                }
            },
        ));
        state.tasks.ttl_sweep = Some(spawn_cleanup_task(
            self.engine.clone(),
            self.settings.ttl_sweep_interval,
        ));

        state.phase = MonitorPhase::Active;
        info!(
            "Performance monitor active ({} degraded observer(s))",
            state.degraded.len()
        );
    }

    fn spawn_threshold_poll(self: &Arc<Self>) -> JoinHandle<()> {
        spawn_monitor_task(
            "threshold_poll",
            Arc::downgrade(self),
            self.settings.optimization_interval,
            |monitor| async move {
                monitor.run_optimization_pass().await;
            },
        )
    }

    // == Optimization Loop ==
    /// One pass of the threshold-driven loop.
    ///
    /// 1. read cache stats
    /// 2. targeted invalidation of large stores under the hit-rate threshold
    /// 3. memory cleanup over the memory threshold, aggressive if still over
    /// 4. record a `cache_monitoring` metric carrying the pre-cleanup stats
    ///
    /// Concurrent passes are not stacked: a pass requested while one is
    /// running returns a skipped outcome.
    pub async fn run_optimization_pass(&self) -> OptimizationOutcome {
        if self.optimizing.swap(true, Ordering::AcqRel) {
            debug!("Optimization pass already running, skipping");
            return OptimizationOutcome::skipped();
        }
        let _guard = PassGuard(&self.optimizing);
        self.optimize().await
    }

    async fn optimize(&self) -> OptimizationOutcome {
        let mut engine = self.engine.write().await;
        let stats = match engine.get_cache_stats() {
            Ok(stats) => stats,
            Err(e) => {
                debug!("Optimization pass skipped: {}", e);
                return OptimizationOutcome::skipped();
            }
        };

        let mut outcome = OptimizationOutcome {
            memory_after: stats.total_memory_usage,
            within_memory_budget: true,
            ..OptimizationOutcome::default()
        };

        for (name, store) in &stats.stores {
            if store.lookups() == 0
                || !self.thresholds.hit_rate_violated(store.hit_rate)
                || store.size <= self.settings.store_size_ceiling
            {
                continue;
            }
            warn!(
                "Store '{}' hit rate {:.2} below {:.2} with {} entries, invalidating entries older than {} ms",
                name, store.hit_rate, self.thresholds.cache_hit_rate, store.size, self.settings.short_window_ms
            );
            match engine.invalidate(name, Invalidation::MaxAge(self.settings.short_window_ms)) {
                Ok(removed) => outcome.targeted_invalidations.push(TargetedInvalidation {
                    store: name.clone(),
                    hit_rate: store.hit_rate,
                    size: store.size,
                    removed,
                }),
                Err(e) => error!("Targeted invalidation of '{}' failed: {}", name, e),
            }
        }

        if self.thresholds.memory_violated(engine.total_memory_usage()) {
            warn!(
                "Cache memory {} bytes exceeds {} bytes, running memory cleanup",
                engine.total_memory_usage(),
                self.thresholds.memory_usage
            );
            match engine.perform_memory_cleanup() {
                Ok(report) => outcome.memory_cleanup = Some(report),
                Err(e) => error!("Memory cleanup failed: {}", e),
            }

            if self.thresholds.memory_violated(engine.total_memory_usage()) {
                warn!("Memory still over limit, escalating to aggressive cleanup");
                match engine.perform_aggressive_cleanup() {
                    Ok(report) => outcome.aggressive_cleanup = Some(report),
                    Err(e) => error!("Aggressive cleanup failed: {}", e),
                }
            }
        }

        outcome.memory_after = engine.total_memory_usage();
        outcome.within_memory_budget = !self.thresholds.memory_violated(outcome.memory_after);
        if !outcome.within_memory_budget {
            warn!(
                "Cleanup exhausted with {} bytes cached (limit {})",
                outcome.memory_after, self.thresholds.memory_usage
            );
        }

        let payload = json!({
            "stats": stats,
            "actions": &outcome,
        });
        if let Err(e) = engine.record_performance_metric("cache_monitoring", payload) {
            debug!("cache_monitoring metric dropped: {}", e);
        }
        outcome
    }

    // == Memory Pressure ==
    /// Heap pressure from the latest sample, or the engine's share of its
    /// memory budget when the host offers no heap readings.
    async fn memory_pressure(&self) -> f64 {
        let sample = self.state.lock().last_memory;
        match sample {
            Some(sample) if self.capabilities.has_memory_api => sample.pressure(),
            _ => {
                let used = self.engine.read().await.total_memory_usage();
                if self.thresholds.memory_usage == 0 {
                    0.0
                } else {
                    used as f64 / self.thresholds.memory_usage as f64
                }
            }
        }
    }

    /// Memory sampling tick: flushes throttled signal metrics, records a
    /// `memory_usage` metric and runs an out-of-schedule optimization pass
    /// when pressure crosses the threshold.
    pub async fn sample_memory(&self) -> f64 {
        self.flush_throttled_signals().await;

        let pressure = self.memory_pressure().await;
        let cache_bytes = self.engine.read().await.total_memory_usage();
        self.record(
            "memory_usage",
            json!({ "pressure": pressure, "cache_bytes": cache_bytes }),
        )
        .await;

        if pressure >= self.settings.memory_pressure_threshold {
            self.on_memory_pressure(pressure).await;
        }
        pressure
    }

    async fn on_memory_pressure(&self, pressure: f64) {
        warn!(
            "Memory pressure {:.2} at or above {:.2}, optimizing now",
            pressure, self.settings.memory_pressure_threshold
        );
        self.run_optimization_pass().await;
    }

    async fn flush_throttled_signals(&self) {
        let ready = self.state.lock().throttle.take_ready(Instant::now());
        for (category, payload) in ready {
            self.record(category, payload).await;
        }
    }

    // == Signals ==
    /// Consumes one browser signal. Signals after teardown are ignored.
    pub async fn handle_signal(self: &Arc<Self>, signal: BrowserSignal) {
        if self.phase().is_terminal() {
            debug!("Ignoring {} signal after teardown", signal.kind());
            return;
        }

        match signal {
            BrowserSignal::VisibilityChanged { hidden: true } => self.suspend().await,
            BrowserSignal::VisibilityChanged { hidden: false } => self.resume(),
            BrowserSignal::ConnectionChanged {
                effective_type,
                downlink_mbps,
                rtt_ms,
            } => {
                if !self.capabilities.has_connection_api {
                    debug!("Connection signal dropped: no connection observer");
                    return;
                }
                let mut state = self.state.lock();
                state.connection_type = Some(effective_type.clone());
                state.throttle.push(
                    "connection_change",
                    json!({
                        "effective_type": effective_type,
                        "downlink_mbps": downlink_mbps,
                        "rtt_ms": rtt_ms,
                    }),
                );
            }
            BrowserSignal::NavigationTiming {
                dom_content_loaded_ms,
                load_event_ms,
                first_paint_ms,
            } => {
                if !self.capabilities.has_performance_observer {
                    debug!("Navigation timing dropped: no performance observer");
                    return;
                }
                self.state.lock().navigation = NavigationTimings {
                    dom_content_loaded_ms: Some(dom_content_loaded_ms),
                    load_event_ms: Some(load_event_ms),
                    first_paint_ms,
                };
                self.record(
                    "page_performance",
                    json!({
                        "dom_content_loaded_ms": dom_content_loaded_ms,
                        "load_event_ms": load_event_ms,
                        "first_paint_ms": first_paint_ms,
                    }),
                )
                .await;
            }
            BrowserSignal::ResourceTiming {
                name,
                duration_ms,
                transfer_size,
            } => {
                if !self.capabilities.has_performance_observer {
                    debug!("Resource timing dropped: no performance observer");
                    return;
                }
                if self.thresholds.response_time_violated(duration_ms) {
                    warn!("Slow resource '{}': {:.0} ms", name, duration_ms);
                }
                self.record(
                    "resource_timing",
                    json!({
                        "name": name,
                        "duration_ms": duration_ms,
                        "transfer_size": transfer_size,
                    }),
                )
                .await;
            }
            BrowserSignal::NetworkRequest {
                url,
                method,
                duration_ms,
                status,
            } => {
                let observation = RequestObservation::from_status(duration_ms, status);
                self.record_request(&url, &method, observation, status.map(|s| json!(s)))
                    .await;
            }
            BrowserSignal::MemorySample(sample) => {
                if !self.capabilities.has_memory_api {
                    debug!("Memory sample dropped: no memory observer");
                    return;
                }
                {
                    let mut state = self.state.lock();
                    state.last_memory = Some(sample);
                    state.throttle.push(
                        "memory_sample",
                        json!({
                            "used_bytes": sample.used_bytes,
                            "limit_bytes": sample.limit_bytes,
                            "pressure": sample.pressure(),
                        }),
                    );
                }
                let pressure = sample.pressure();
                if pressure >= self.settings.memory_pressure_threshold {
                    self.on_memory_pressure(pressure).await;
                }
            }
            BrowserSignal::JsError { message, source } => {
                self.state.lock().network.record_js_error();
                self.record(
                    "javascript_error",
                    json!({ "message": message, "source": source }),
                )
                .await;
            }
            BrowserSignal::UnhandledRejection { reason } => {
                self.state.lock().network.record_rejection();
                self.record("unhandled_rejection", json!({ "reason": reason }))
                    .await;
            }
            BrowserSignal::Mutation(event) => {
                self.reactor.lock().apply(event);
            }
            BrowserSignal::ElementVisible { id } => {
                if !self.reactor.lock().element_visible(&id) {
                    debug!("Visible element '{}' has nothing to load", id);
                }
            }
        }
    }

    // == Network Observation ==
    /// Runs `request`, recording its duration and success as a
    /// `network_request` metric. The outcome is returned untouched.
    pub async fn observe_request<T, E, F>(
        &self,
        method: &str,
        url: &str,
        request: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let started = Instant::now();
        let result = request.await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let (failed, error) = match &result {
            Ok(_) => (false, None),
            Err(e) => (true, Some(json!(e.to_string()))),
        };
        self.record_request(url, method, RequestObservation { duration_ms, failed }, error)
            .await;
        result
    }

    async fn record_request(
        &self,
        url: &str,
        method: &str,
        observation: RequestObservation,
        detail: Option<Value>,
    ) {
        let payload = json!({
            "url": url,
            "method": method,
            "duration_ms": observation.duration_ms,
            "success": !observation.failed,
            "detail": detail,
        });
        if observation.duration_ms > self.thresholds.avg_response_time_ms {
            warn!("Slow request {} {}: {:.0} ms", method, url, observation.duration_ms);
        }
        self.state.lock().network.observe(observation);
        self.record("network_request", payload).await;
    }

    async fn record(&self, category: &str, payload: Value) {
        if let Err(e) = self
            .engine
            .write()
            .await
            .record_performance_metric(category, payload)
        {
            debug!("{} metric dropped: {}", category, e);
        }
    }

    async fn prune_metrics(&self) {
        match self.engine.write().await.prune_metrics() {
            Ok(0) => {}
            Ok(pruned) => debug!("Pruned {} aged metric record(s)", pruned),
            Err(e) => debug!("Metric pruning skipped: {}", e),
        }
    }

    // == Frame Queue ==
    /// Applies queued lazy loads within one frame budget.
    pub fn flush_frame(&self) -> FlushReport {
        self.reactor.lock().flush_frame(FRAME_BUDGET)
    }

    // == Visibility ==
    async fn suspend(&self) {
        {
            let mut state = self.state.lock();
            if !state.phase.can_transition_to(MonitorPhase::Suspended) {
                debug!("Suspend ignored in phase {:?}", state.phase);
                return;
            }
            if let Some(handle) = state.tasks.threshold_poll.take() {
                handle.abort();
            }
            state.phase = MonitorPhase::Suspended;
        }
        info!("Page hidden, monitor suspended");

        self.reactor.lock().pause_animations();
        let cleanup = self.engine.write().await.perform_aggressive_cleanup();
        if let Err(e) = cleanup {
            debug!("Background cleanup skipped: {}", e);
        }
    }

    fn resume(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if state.phase != MonitorPhase::Suspended {
            debug!("Resume ignored in phase {:?}", state.phase);
            return;
        }
        state.tasks.threshold_poll = Some(self.spawn_threshold_poll());
        state.phase = MonitorPhase::Active;
        drop(state);

        self.reactor.lock().resume_animations();
        info!("Page visible, monitor resumed");
    }

    // == Status & Reports ==
    fn performance_stats(&self, memory_pressure: f64) -> PerformanceStats {
        let (network, last_memory, navigation, connection_type) = {
            let state = self.state.lock();
            (
                state.network.snapshot(),
                state.last_memory,
                state.navigation,
                state.connection_type.clone(),
            )
        };
        let reactor = self.reactor.lock();
        PerformanceStats {
            network,
            memory_pressure: Some(memory_pressure),
            last_memory_sample: last_memory,
            dom_content_loaded_ms: navigation.dom_content_loaded_ms,
            page_load_ms: navigation.load_event_ms,
            first_paint_ms: navigation.first_paint_ms,
            connection_type,
            lazy_observed: reactor.lazy().observed_count(),
            lazy_loaded: reactor.lazy().loaded_count(),
            pending_frame_work: reactor.pending_loads(),
        }
    }

    async fn cache_stats(&self) -> CacheStatsSnapshot {
        self.engine
            .read()
            .await
            .get_cache_stats()
            .unwrap_or_default()
    }

    /// Health check for the UI layer.
    pub async fn get_performance_status(&self) -> PerformanceStatus {
        let cache_stats = self.cache_stats().await;
        let performance_stats = self.performance_stats(self.memory_pressure().await);
        let recommendations = recommendations(
            &cache_stats,
            &performance_stats,
            &self.thresholds,
            self.settings.memory_pressure_threshold,
        );

        PerformanceStatus {
            healthy: recommendations.is_empty(),
            phase: self.phase(),
            cache_stats,
            performance_stats,
            recommendations,
        }
    }

    /// Assembles a snapshot report and records it as a `performance_report`
    /// metric. Throttled signal metrics still pending are recorded first,
    /// whatever their window.
    pub async fn generate_performance_report(&self) -> PerformanceReport {
        let pending = self.state.lock().throttle.drain();
        for (category, payload) in pending {
            self.record(category, payload).await;
        }

        let status = self.get_performance_status().await;
        let report = PerformanceReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            phase: status.phase,
            cache_stats: status.cache_stats,
            performance_stats: status.performance_stats,
            thresholds: self.thresholds,
            recommendations: status.recommendations,
            degraded_observers: self.degraded_observers(),
        };

        info!(
            "Performance report: hit rate {:.2} over {} lookup(s), {} recommendation(s)",
            report.cache_stats.overall_hit_rate(),
            report.cache_stats.total_lookups(),
            report.recommendations.len()
        );
        match serde_json::to_value(&report) {
            Ok(payload) => self.record("performance_report", payload).await,
            Err(e) => error!("Could not serialize performance report: {}", e),
        }
        report
    }

    // == Teardown ==
    /// Stops every task, releases the engine and enters `Destroyed`.
    ///
    /// Idempotent and safe before `start`.
    pub async fn cleanup(&self) {
        let aborted = {
            let mut state = self.state.lock();
            if state.phase.is_terminal() {
                debug!("Monitor already destroyed");
                return;
            }
            state.phase = MonitorPhase::Destroyed;
            state.tasks.abort_all()
        };

        self.reactor.lock().reset();
        self.engine.write().await.destroy();
        info!("Performance monitor destroyed ({} task(s) stopped)", aborted);
    }

    // == Accessors ==
    pub fn phase(&self) -> MonitorPhase {
        self.state.lock().phase
    }

    pub fn engine(&self) -> SharedEngine {
        self.engine.clone()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Observers that could not be registered.
    pub fn degraded_observers(&self) -> Vec<String> {
        self.state.lock().degraded.clone()
    }

    /// Whether the periodic cache-threshold poll is armed.
    pub fn is_polling(&self) -> bool {
        self.state.lock().tasks.threshold_poll.is_some()
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        self.state.get_mut().tasks.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{current_timestamp_ms, SetOptions};
    use crate::optimizer::{AnimationKind, MutationEvent, UpdatePriority};

    fn monitor_with(thresholds: Thresholds, capabilities: Capabilities) -> Arc<PerformanceMonitor> {
        PerformanceMonitor::new(None, thresholds, capabilities, MonitorSettings::default())
    }

    fn monitor() -> Arc<PerformanceMonitor> {
        monitor_with(Thresholds::default(), Capabilities::full())
    }

    #[tokio::test]
    async fn test_new_monitor_is_setting_up() {
        let monitor = monitor();
        assert_eq!(monitor.phase(), MonitorPhase::SettingUp);
        assert!(!monitor.is_polling());
        assert!(monitor.engine().read().await.is_initialized());
    }

    #[tokio::test]
    async fn test_start_activates_and_arms_poll() {
        let monitor = monitor();
        monitor.start();
        assert_eq!(monitor.phase(), MonitorPhase::Active);
        assert!(monitor.is_polling());
        assert!(monitor.degraded_observers().is_empty());

        // Second start is a no-op
        monitor.start();
        assert_eq!(monitor.phase(), MonitorPhase::Active);
        monitor.cleanup().await;
    }

    #[tokio::test]
    async fn test_low_hit_rate_store_is_invalidated() {
        let monitor = monitor();
        let now = current_timestamp_ms();
        {
            let engine = monitor.engine();
            let mut engine = engine.write().await;
            for i in 0..60 {
                engine
                    .set_at("api", &format!("k{}", i), json!(i), SetOptions::default(), now - 120_000)
                    .unwrap();
            }
            for _ in 0..2 {
                engine.get_at("api", "k0", now).unwrap();
            }
            for i in 0..8 {
                engine.get_at("api", &format!("missing{}", i), now).unwrap();
            }
        }

        let outcome = monitor.run_optimization_pass().await;
        assert!(!outcome.skipped);
        assert_eq!(outcome.targeted_invalidations.len(), 1);
        let targeted = &outcome.targeted_invalidations[0];
        assert_eq!(targeted.store, "api");
        assert_eq!(targeted.size, 60);
        assert_eq!(targeted.removed, 60);
        assert!((targeted.hit_rate - 0.2).abs() < 1e-9);
        assert!(outcome.memory_cleanup.is_none());

        let engine = monitor.engine();
        let engine = engine.read().await;
        assert_eq!(engine.metrics("cache_monitoring").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_small_store_is_left_alone() {
        let monitor = monitor();
        {
            let engine = monitor.engine();
            let mut engine = engine.write().await;
            engine.set("api", "a", json!(1), SetOptions::default()).unwrap();
            engine.get("api", "missing").unwrap();
        }

        let outcome = monitor.run_optimization_pass().await;
        assert!(outcome.targeted_invalidations.is_empty());
        assert!(!outcome.intervened());
    }

    #[tokio::test]
    async fn test_memory_over_limit_escalates() {
        let thresholds = Thresholds {
            memory_usage: 1,
            ..Thresholds::default()
        };
        let monitor = monitor_with(thresholds, Capabilities::full());
        {
            let engine = monitor.engine();
            let mut engine = engine.write().await;
            engine.set("user", "profile", json!({"name": "a"}), SetOptions::default()).unwrap();
        }

        let outcome = monitor.run_optimization_pass().await;
        assert!(outcome.memory_cleanup.is_some());
        assert!(outcome.aggressive_cleanup.is_some());
        // The fresh entry of a high priority store survives both passes
        assert!(!outcome.within_memory_budget);
        assert!(outcome.memory_after > 0);
    }

    #[tokio::test]
    async fn test_memory_cleanup_alone_can_suffice() {
        let thresholds = Thresholds {
            memory_usage: 1_000,
            ..Thresholds::default()
        };
        let monitor = monitor_with(thresholds, Capabilities::full());
        {
            let engine = monitor.engine();
            let mut engine = engine.write().await;
            // Older than the api store's five minute max age
            let stale_at = current_timestamp_ms() - 400_000;
            engine
                .set_at("api", "old", json!(1), SetOptions::default().sized(2_000), stale_at)
                .unwrap();
        }

        let outcome = monitor.run_optimization_pass().await;
        let memory = outcome.memory_cleanup.as_ref().unwrap();
        assert_eq!(memory.removed_entries, 1);
        assert!(outcome.aggressive_cleanup.is_none());
        assert!(outcome.within_memory_budget);
        assert_eq!(outcome.memory_after, 0);
    }

    #[tokio::test]
    async fn test_cancelled_pass_does_not_block_later_passes() {
        let monitor = monitor();
        let engine = monitor.engine();

        let held = engine.write().await;
        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            monitor.run_optimization_pass(),
        )
        .await;
        assert!(cancelled.is_err());
        drop(held);

        for _ in 0..3 {
            assert!(!monitor.run_optimization_pass().await.skipped);
        }
        let records = engine.read().await.metrics("cache_monitoring").unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_report_flushes_throttled_signals() {
        let monitor = monitor();
        monitor
            .handle_signal(BrowserSignal::ConnectionChanged {
                effective_type: "3g".to_string(),
                downlink_mbps: Some(1.5),
                rtt_ms: Some(300),
            })
            .await;
        monitor
            .handle_signal(BrowserSignal::ConnectionChanged {
                effective_type: "4g".to_string(),
                downlink_mbps: Some(10.0),
                rtt_ms: Some(50),
            })
            .await;

        monitor.generate_performance_report().await;

        let engine = monitor.engine();
        let records = engine.read().await.metrics("connection_change").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload["effective_type"], "4g");
    }

    #[tokio::test]
    async fn test_concurrent_pass_is_skipped() {
        let monitor = monitor();
        monitor.optimizing.store(true, Ordering::Release);

        let outcome = monitor.run_optimization_pass().await;
        assert!(outcome.skipped);

        monitor.optimizing.store(false, Ordering::Release);
        assert!(!monitor.run_optimization_pass().await.skipped);
    }

    #[tokio::test]
    async fn test_degraded_mode() {
        let monitor = monitor_with(Thresholds::default(), Capabilities::none());
        monitor.start();

        assert_eq!(monitor.phase(), MonitorPhase::Active);
        assert_eq!(
            monitor.degraded_observers(),
            vec!["performance", "memory", "connection"]
        );

        monitor
            .handle_signal(BrowserSignal::MemorySample(MemorySample {
                used_bytes: 10,
                limit_bytes: 100,
            }))
            .await;
        let status = monitor.get_performance_status().await;
        assert!(status.performance_stats.last_memory_sample.is_none());
        monitor.cleanup().await;
    }

    #[tokio::test]
    async fn test_memory_pressure_sample_triggers_pass() {
        let monitor = monitor();
        monitor
            .handle_signal(BrowserSignal::MemorySample(MemorySample {
                used_bytes: 90,
                limit_bytes: 100,
            }))
            .await;

        let engine = monitor.engine();
        let engine = engine.read().await;
        assert_eq!(engine.metrics("cache_monitoring").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hidden_page_suspends_and_resumes() {
        let monitor = monitor();
        monitor.start();
        let two_minutes_ago = current_timestamp_ms() - 120_000;
        {
            let engine = monitor.engine();
            let mut engine = engine.write().await;
            engine
                .set_at("static", "logo", json!("svg"), SetOptions::default(), two_minutes_ago)
                .unwrap();
            engine
                .set_at("user", "profile", json!("me"), SetOptions::default(), two_minutes_ago)
                .unwrap();
        }
        monitor
            .handle_signal(BrowserSignal::Mutation(MutationEvent::ElementAdded {
                id: "hero".to_string(),
                lazy_src: None,
                animation: Some(AnimationKind::Css),
                priority: UpdatePriority::Normal,
            }))
            .await;

        monitor
            .handle_signal(BrowserSignal::VisibilityChanged { hidden: true })
            .await;
        assert_eq!(monitor.phase(), MonitorPhase::Suspended);
        assert!(!monitor.is_polling());
        assert_eq!(monitor.reactor.lock().animations().is_paused("hero"), Some(true));
        {
            // Hiding runs an aggressive cleanup straight away
            let engine = monitor.engine();
            let engine = engine.read().await;
            assert!(engine.peek("static", "logo").is_none());
            assert!(engine.peek("user", "profile").is_some());
        }

        monitor
            .handle_signal(BrowserSignal::VisibilityChanged { hidden: false })
            .await;
        assert_eq!(monitor.phase(), MonitorPhase::Active);
        assert!(monitor.is_polling());
        assert_eq!(monitor.reactor.lock().animations().is_paused("hero"), Some(false));
        monitor.cleanup().await;
    }

    #[tokio::test]
    async fn test_observe_request_passes_outcome_through() {
        let monitor = monitor();

        let ok: Result<u32, String> = monitor
            .observe_request("GET", "/api/a", async { Ok(5) })
            .await;
        assert_eq!(ok, Ok(5));

        let err: Result<u32, String> = monitor
            .observe_request("POST", "/api/b", async { Err("boom".to_string()) })
            .await;
        assert_eq!(err, Err("boom".to_string()));

        let status = monitor.get_performance_status().await;
        assert_eq!(status.performance_stats.network.total_requests, 2);
        assert_eq!(status.performance_stats.network.failed_requests, 1);

        let engine = monitor.engine();
        let records = engine.read().await.metrics("network_request").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload["method"], "GET");
        assert_eq!(records[1].payload["method"], "POST");
        assert_eq!(records[1].payload["success"], json!(false));
    }

    #[tokio::test]
    async fn test_report_lists_error_rate_violation() {
        let monitor = monitor();
        monitor
            .handle_signal(BrowserSignal::NetworkRequest {
                url: "/api/x".to_string(),
                method: "GET".to_string(),
                duration_ms: 12.0,
                status: Some(500),
            })
            .await;

        let report = monitor.generate_performance_report().await;
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.threshold == "error_rate"));

        let engine = monitor.engine();
        let engine = engine.read().await;
        assert_eq!(engine.metrics("performance_report").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let monitor = monitor();
        monitor.start();

        monitor.cleanup().await;
        monitor.cleanup().await;
        assert_eq!(monitor.phase(), MonitorPhase::Destroyed);
        assert!(!monitor.is_polling());
        assert!(!monitor.engine().read().await.is_initialized());

        // Signals after teardown are ignored and status degrades to empty stats
        monitor
            .handle_signal(BrowserSignal::VisibilityChanged { hidden: true })
            .await;
        assert_eq!(monitor.phase(), MonitorPhase::Destroyed);
        let status = monitor.get_performance_status().await;
        assert_eq!(status.cache_stats.total_entries, 0);
        assert!(monitor.run_optimization_pass().await.skipped);
    }

    #[tokio::test]
    async fn test_cleanup_before_start() {
        let monitor = monitor();
        monitor.cleanup().await;
        assert_eq!(monitor.phase(), MonitorPhase::Destroyed);
        monitor.start();
        assert_eq!(monitor.phase(), MonitorPhase::Destroyed);
    }
}
