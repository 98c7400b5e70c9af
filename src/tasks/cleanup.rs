//! TTL Cleanup Task
//!
//! Background task that periodically removes expired Entry Store items.
//! The distributed tier expires keys natively and is not touched here.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::manager::CacheManager;

/// Spawns a background task that periodically sweeps expired local entries.
///
/// The first sweep happens one `interval` after spawning. A zero interval
/// falls back to the default sweep period. Abort the returned
/// handle to stop the task, e.g. during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = CacheManager::from_config(&config);
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), config.cleanup_interval_duration());
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: CacheManager, interval: Duration) -> JoinHandle<()> {
    let interval = if interval.is_zero() {
        let fallback = CacheConfig::default().cleanup_interval_duration();
        warn!(
            "Cleanup interval of zero is invalid, using {} seconds",
            fallback.as_secs()
        );
        fallback
    } else {
        interval
    };

    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            interval.as_secs_f64()
        );

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let removed = cache.sweep_expired().await;

            if removed > 0 {
                info!("Cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("Cache cleanup: no expired entries found");
            }
        }
    })
}
