//! Monitor tick driver

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::monitor::PerformanceMonitor;

/// Spawns a loop calling `tick` every `period` for as long as the monitor is
/// alive.
///
/// Each tick runs in its own task so a panic inside it is logged and the
/// loop keeps going. The loop holds only a weak reference and exits once the
/// monitor is dropped.
pub fn spawn_monitor_task<F, Fut>(
    name: &'static str,
    monitor: Weak<PerformanceMonitor>,
    period: Duration,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<PerformanceMonitor>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        debug!("Starting '{}' task every {:?}", name, period);

        loop {
            tokio::time::sleep(period).await;

            let Some(monitor) = monitor.upgrade() else {
                debug!("'{}' task exiting: monitor dropped", name);
                break;
            };

            if let Err(e) = tokio::spawn(tick(monitor)).await {
                error!("'{}' tick failed: {}", name, e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{Capabilities, MonitorSettings, Thresholds};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn monitor() -> Arc<PerformanceMonitor> {
        PerformanceMonitor::new(
            None,
            Thresholds::default(),
            Capabilities::full(),
            MonitorSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_panicking_tick_does_not_stop_loop() {
        let monitor = monitor();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let handle = spawn_monitor_task(
            "flaky",
            Arc::downgrade(&monitor),
            Duration::from_millis(10),
            move |_monitor| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("first tick fails");
                    }
                }
            },
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(ticks.load(Ordering::SeqCst) >= 3);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn test_loop_exits_when_monitor_dropped() {
        let monitor = monitor();
        let handle = spawn_monitor_task(
            "noop",
            Arc::downgrade(&monitor),
            Duration::from_millis(10),
            |_monitor| async {},
        );

        drop(monitor);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
