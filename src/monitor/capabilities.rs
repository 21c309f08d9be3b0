//! Capability descriptor
//!
//! Which optional browser APIs the host exposes, computed once at startup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Heap usage sampling (`performance.memory`)
    pub has_memory_api: bool,
    /// Network connection information
    pub has_connection_api: bool,
    /// Navigation and resource timing entries
    pub has_performance_observer: bool,
}

impl Capabilities {
    /// Everything available.
    pub fn full() -> Self {
        Self {
            has_memory_api: true,
            has_connection_api: true,
            has_performance_observer: true,
        }
    }

    /// Nothing optional available.
    pub fn none() -> Self {
        Self {
            has_memory_api: false,
            has_connection_api: false,
            has_performance_observer: false,
        }
    }

    /// Names of the observers that cannot be registered.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_performance_observer {
            missing.push("performance");
        }
        if !self.has_memory_api {
            missing.push("memory");
        }
        if !self.has_connection_api {
            missing.push("connection");
        }
        missing
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}
