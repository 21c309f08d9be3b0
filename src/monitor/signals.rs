//! Browser signal inputs
//!
//! Everything the host page reports to the monitor. Signals are read-only
//! observations; the monitor never answers them.

use serde::{Deserialize, Serialize};

use crate::optimizer::MutationEvent;

// == Memory Sample ==
/// One heap-usage reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    pub used_bytes: u64,
    pub limit_bytes: u64,
}

impl MemorySample {
    /// `used / limit`, 0.0 when the limit is unknown.
    pub fn pressure(&self) -> f64 {
        if self.limit_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.limit_bytes as f64
        }
    }
}

// == Browser Signal ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserSignal {
    /// Page visibility changed
    VisibilityChanged { hidden: bool },
    /// Network connection characteristics changed
    ConnectionChanged {
        effective_type: String,
        #[serde(default)]
        downlink_mbps: Option<f64>,
        #[serde(default)]
        rtt_ms: Option<u64>,
    },
    /// Navigation timing entry
    NavigationTiming {
        dom_content_loaded_ms: f64,
        load_event_ms: f64,
        #[serde(default)]
        first_paint_ms: Option<f64>,
    },
    /// Resource timing entry
    ResourceTiming {
        name: String,
        duration_ms: f64,
        #[serde(default)]
        transfer_size: u64,
    },
    /// A fetch/XHR call completed (or failed) at the interception point
    NetworkRequest {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        duration_ms: f64,
        /// HTTP status; None when the call failed before a response
        #[serde(default)]
        status: Option<u16>,
    },
    /// Heap usage reading
    MemorySample(MemorySample),
    /// Uncaught script error
    JsError {
        message: String,
        #[serde(default)]
        source: Option<String>,
    },
    /// Unhandled promise rejection
    UnhandledRejection { reason: String },
    /// DOM mutation
    Mutation(MutationEvent),
    /// An observed element scrolled into view
    ElementVisible { id: String },
}

fn default_method() -> String {
    "GET".to_string()
}

impl BrowserSignal {
    /// Short name used in logs and metric payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            BrowserSignal::VisibilityChanged { .. } => "visibility_changed",
            BrowserSignal::ConnectionChanged { .. } => "connection_changed",
            BrowserSignal::NavigationTiming { .. } => "navigation_timing",
            BrowserSignal::ResourceTiming { .. } => "resource_timing",
            BrowserSignal::NetworkRequest { .. } => "network_request",
            BrowserSignal::MemorySample(_) => "memory_sample",
            BrowserSignal::JsError { .. } => "js_error",
            BrowserSignal::UnhandledRejection { .. } => "unhandled_rejection",
            BrowserSignal::Mutation(_) => "mutation",
            BrowserSignal::ElementVisible { .. } => "element_visible",
        }
    }
}
