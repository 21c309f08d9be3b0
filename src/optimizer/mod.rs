//! Optimizer Module
//!
//! Scheduling helpers that keep monitoring housekeeping and page updates off
//! the critical path: a frame-budgeted batch queue, a coalescing throttle,
//! pausable animation adapters and the mutation reactor.

mod batch;
mod pausable;
mod reactor;
mod throttle;

pub use batch::{BatchQueue, FlushReport, UpdatePriority, DEFAULT_HIGH_WATER_MARK, FRAME_BUDGET};
pub use pausable::{
    AnimationKind, AnimationRegistry, ChartAnimation, CssAnimation, FrameAnimation, Pausable,
};
pub use reactor::{
    LazyLoadTracker, LazyTarget, LoadJob, LoadState, MutationEvent, MutationReactor,
    LAZY_SOURCE_ATTRIBUTE,
};
pub use throttle::{PushOutcome, ThrottledQueue};
