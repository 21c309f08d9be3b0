//! Frame-budgeted batch queue
//!
//! Work items are queued with a priority and drained one frame at a time:
//! highest priority first, FIFO within a priority, stopping once the frame
//! budget is spent. Whatever is left waits for the next frame.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One display frame at 60 Hz
pub const FRAME_BUDGET: Duration = Duration::from_millis(16);

/// Pending items above which the queue logs a warning
pub const DEFAULT_HIGH_WATER_MARK: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePriority {
    High,
    Normal,
    Low,
}

impl Default for UpdatePriority {
    fn default() -> Self {
        UpdatePriority::Normal
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub executed: usize,
    pub deferred: usize,
}

#[derive(Debug)]
pub struct BatchQueue<T> {
    high: VecDeque<T>,
    normal: VecDeque<T>,
    low: VecDeque<T>,
    high_water_mark: usize,
    above_mark: bool,
}

impl<T> BatchQueue<T> {
    pub fn new() -> Self {
        Self::with_high_water_mark(DEFAULT_HIGH_WATER_MARK)
    }

    pub fn with_high_water_mark(high_water_mark: usize) -> Self {
        Self {
            high: VecDeque::new(),
            normal: VecDeque::new(),
            low: VecDeque::new(),
            high_water_mark,
            above_mark: false,
        }
    }

    pub fn push(&mut self, priority: UpdatePriority, item: T) {
        match priority {
            UpdatePriority::High => self.high.push_back(item),
            UpdatePriority::Normal => self.normal.push_back(item),
            UpdatePriority::Low => self.low.push_back(item),
        }

        let pending = self.len();
        if pending > self.high_water_mark && !self.above_mark {
            self.above_mark = true;
            warn!(
                "Batch queue backlog at {} items (high-water mark {})",
                pending, self.high_water_mark
            );
        }
    }

    fn pop_next(&mut self) -> Option<T> {
        self.high
            .pop_front()
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.low.pop_front())
    }

    /// Applies queued items within `budget`. At least one item runs per call
    /// so a budget smaller than one item's cost still makes progress.
    pub fn flush(&mut self, budget: Duration, mut apply: impl FnMut(T)) -> FlushReport {
        let started = Instant::now();
        let mut executed = 0;

        while let Some(item) = self.pop_next() {
            apply(item);
            executed += 1;
            if started.elapsed() >= budget {
                break;
            }
        }

        if self.len() <= self.high_water_mark {
            self.above_mark = false;
        }
        FlushReport {
            executed,
            deferred: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.high.clear();
        self.normal.clear();
        self.low.clear();
        self.above_mark = false;
    }
}

impl<T> Default for BatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
