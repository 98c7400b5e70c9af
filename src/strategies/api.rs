//! API response caching with stale-while-revalidate refresh.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::CacheEntry;
use crate::config::CacheConfig;
use crate::manager::{CacheManager, SetOptions};

/// Fraction of the TTL after which a hit triggers a background refresh.
pub const DEFAULT_REFRESH_THRESHOLD: f64 = 0.8;

/// Caches responses of external calls and refreshes them before they expire.
///
/// A hit older than `refresh_threshold × ttl` is returned immediately while a
/// background task re-runs the fetcher and overwrites the entry. At most one
/// refresh per key runs at a time.
#[derive(Debug, Clone)]
pub struct ApiCache {
    cache: CacheManager,
    refresh_threshold: f64,
    refreshing: Arc<Mutex<HashSet<String>>>,
}

impl ApiCache {
    pub fn new(cache: CacheManager) -> Self {
        Self {
            cache,
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
            refreshing: Arc::default(),
        }
    }

    /// Uses `config.refresh_threshold`.
    pub fn from_config(cache: CacheManager, config: &CacheConfig) -> Self {
        Self::new(cache).with_refresh_threshold(config.refresh_threshold)
    }

    /// Overrides the refresh threshold, clamped to `0.0..=1.0`.
    pub fn with_refresh_threshold(mut self, threshold: f64) -> Self {
        self.refresh_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn refresh_threshold(&self) -> f64 {
        self.refresh_threshold
    }

    /// Key of the form `api:{endpoint}:{params as JSON}`.
    pub fn api_key<P: Serialize + ?Sized>(endpoint: &str, params: &P) -> String {
        match serde_json::to_string(params) {
            Ok(params) => format!("api:{endpoint}:{params}"),
            Err(_) => format!("api:{endpoint}"),
        }
    }

    /// Returns the cached response for `key`, fetching on a miss.
    ///
    /// Fetch errors on the miss path are returned unchanged. Errors in a
    /// background refresh are logged and the old entry stays in place.
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, options: SetOptions, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Display + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(entry) = self.cache.get_entry(key).await {
            let refresh = self.needs_refresh(&entry);
            match serde_json::from_value::<T>(entry.value) {
                Ok(value) => {
                    if refresh {
                        self.spawn_refresh(key, options, fetcher);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Cached response has unexpected shape, refetching");
                }
            }
        }

        let value = fetcher().await?;
        self.cache.set(key, &value, options).await;
        Ok(value)
    }

    fn needs_refresh(&self, entry: &CacheEntry) -> bool {
        let age = entry.age_ms(self.cache.clock().now_ms()) as f64;
        age > entry.ttl_millis as f64 * self.refresh_threshold
    }

    fn spawn_refresh<T, E, F, Fut>(&self, key: &str, options: SetOptions, fetcher: F)
    where
        T: Serialize + Send + Sync + 'static,
        E: Display + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let Some(slot) = RefreshSlot::claim(&self.refreshing, key) else {
            debug!(key = %key, "Background refresh already running");
            return;
        };
        let cache = self.cache.clone();
        let key = key.to_string();
        debug!(key = %key, "Refreshing cached response in background");

        tokio::spawn(async move {
            let _slot = slot;
            match fetcher().await {
                Ok(value) => cache.set(&key, &value, options).await,
                Err(err) => {
                    warn!(key = %key, error = %err, "Background refresh failed, keeping cached response");
                }
            }
        });
    }
}

/// Marks a key as being refreshed until dropped.
struct RefreshSlot {
    pending: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl RefreshSlot {
    fn claim(pending: &Arc<Mutex<HashSet<String>>>, key: &str) -> Option<Self> {
        if !lock_pending(pending).insert(key.to_string()) {
            return None;
        }
        Some(Self {
            pending: Arc::clone(pending),
            key: key.to_string(),
        })
    }
}

impl Drop for RefreshSlot {
    fn drop(&mut self) {
        lock_pending(&self.pending).remove(&self.key);
    }
}

fn lock_pending(pending: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
