//! Background Tasks Module
//!
//! Periodic work that runs while the monitor is alive.
//!
//! # Tasks
//! - TTL sweep: removes expired cache entries at a fixed interval
//! - Monitor ticks: threshold polling, memory sampling, reporting and frame
//!   flushing, each isolated so one failing tick never stops the loop

mod cleanup;
mod periodic;

pub use cleanup::spawn_cleanup_task;
pub use periodic::spawn_monitor_task;
