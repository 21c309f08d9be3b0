//! Network and error observation
//!
//! Rolling statistics over intercepted requests, plus counters for script
//! errors. Pure bookkeeping: nothing here touches the observed call.

use std::collections::VecDeque;

use serde::Serialize;

/// Observations kept for averages
pub const DEFAULT_WINDOW: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct RequestObservation {
    pub duration_ms: f64,
    pub failed: bool,
}

impl RequestObservation {
    /// A request fails when it produced no response or a 4xx/5xx status.
    pub fn from_status(duration_ms: f64, status: Option<u16>) -> Self {
        Self {
            duration_ms,
            failed: status.map_or(true, |code| code >= 400),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkStats {
    window: VecDeque<RequestObservation>,
    capacity: usize,
    total_requests: u64,
    total_failures: u64,
    js_errors: u64,
    unhandled_rejections: u64,
}

impl NetworkStats {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            total_requests: 0,
            total_failures: 0,
            js_errors: 0,
            unhandled_rejections: 0,
        }
    }

    pub fn observe(&mut self, observation: RequestObservation) {
        self.total_requests += 1;
        if observation.failed {
            self.total_failures += 1;
        }
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(observation);
    }

    pub fn record_js_error(&mut self) {
        self.js_errors += 1;
    }

    pub fn record_rejection(&mut self) {
        self.unhandled_rejections += 1;
    }

    /// Mean duration over the window, 0.0 with no observations.
    pub fn avg_response_time_ms(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().map(|o| o.duration_ms).sum::<f64>() / self.window.len() as f64
    }

    /// Failed fraction over the window, 0.0 with no observations.
    pub fn error_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().filter(|o| o.failed).count() as f64 / self.window.len() as f64
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            avg_response_time_ms: self.avg_response_time_ms(),
            error_rate: self.error_rate(),
            total_requests: self.total_requests,
            failed_requests: self.total_failures,
            js_errors: self.js_errors,
            unhandled_rejections: self.unhandled_rejections,
        }
    }
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSnapshot {
    pub avg_response_time_ms: f64,
    pub error_rate: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub js_errors: u64,
    pub unhandled_rejections: u64,
}
