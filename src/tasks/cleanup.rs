//! Cache Sweep Task
//!
//! Background task that periodically drops expired response-cache entries.
//! Reads already skip expired entries; the sweep only bounds memory held by
//! keys nobody asks for again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ResponseCache;

/// Spawns a task that sweeps `cache` every `cleanup_interval_secs` seconds.
///
/// Returns the task handle; abort it on shutdown.
///
/// # Example
/// ```ignore
/// let cache = ResponseCache::new(100, Duration::from_secs(300));
/// let sweeper = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_cleanup_task(cache: ResponseCache, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup().await;

            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}
