//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::SharedEngine;

/// Spawns a background task that periodically sweeps expired entries out of
/// every store.
///
/// The task sleeps for `interval` between runs and stops on its own once the
/// engine has been destroyed.
///
/// # Returns
/// A JoinHandle that can be aborted during teardown.
pub fn spawn_cleanup_task(engine: SharedEngine, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting TTL sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let swept = {
                let mut guard = engine.write().await;
                guard.sweep_expired()
            };

            match swept {
                Ok(0) => debug!("TTL sweep: no expired entries found"),
                Ok(removed) => info!("TTL sweep: removed {} expired entries", removed),
                Err(e) => {
                    warn!("TTL sweep stopping: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEngine, EngineConfig, SetOptions};
    use serde_json::json;

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let engine = CacheEngine::shared(EngineConfig::default());
        engine
            .write()
            .await
            .set("api", "expire_soon", json!("v"), SetOptions::with_ttl(20))
            .unwrap();

        let handle = spawn_cleanup_task(engine.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let stats = engine.read().await.get_cache_stats().unwrap();
        assert_eq!(stats.total_entries, 0, "expired entry should be swept");

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_preserves_valid_entries() {
        let engine = CacheEngine::shared(EngineConfig::default());
        engine
            .write()
            .await
            .set("api", "long_lived", json!("v"), SetOptions::with_ttl(3_600_000))
            .unwrap();

        let handle = spawn_cleanup_task(engine.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let value = engine.write().await.get("api", "long_lived").unwrap();
        assert_eq!(value, Some(json!("v")));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_stops_after_destroy() {
        let engine = CacheEngine::shared(EngineConfig::default());
        let handle = spawn_cleanup_task(engine.clone(), Duration::from_millis(10));

        engine.write().await.destroy();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished(), "task should exit once the engine is gone");
    }
}
