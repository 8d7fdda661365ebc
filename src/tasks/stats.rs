//! Cache Statistics Reporter
//!
//! Background task that periodically logs a snapshot of cache statistics.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ObjectCache;

/// Spawns a background task that logs cache statistics every
/// `interval_secs` seconds.
///
/// The snapshot is rendered as JSON so it can be picked out of the log
/// stream by tooling. Only a read lock is taken.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = ObjectCache::from_config(&config);
/// let stats_handle = spawn_stats_task(cache.clone(), 60);
/// // Later, during shutdown:
/// stats_handle.abort();
/// ```
pub fn spawn_stats_task(cache: ObjectCache, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache stats reporter with interval of {} seconds",
            interval_secs
        );

        let mut last_lookups = 0u64;
        loop {
            tokio::time::sleep(interval).await;

            let stats = cache.stats().await;
            let lookups = stats.hits + stats.misses;

            if lookups == last_lookups {
                debug!("Cache stats: no lookups since last report");
                continue;
            }
            last_lookups = lookups;

            match serde_json::to_string(&stats) {
                Ok(json) => info!(hit_rate = stats.hit_rate(), "Cache stats: {}", json),
                Err(e) => debug!("Failed to render cache stats: {}", e),
            }
        }
    })
}
