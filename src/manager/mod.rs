//! Cache Manager
//!
//! Façade over the Entry Store, the optional distributed tier and the tag
//! index. Reads go distributed-first then local; writes go to both tiers.
//! Nothing in here returns an infrastructure error to the caller: a broken
//! tier degrades to a miss.

mod inflight;
mod options;

pub use options::SetOptions;

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, DistributedStatus, EntryStore, StatsCounters};
use crate::clock::{Clock, SystemClock};
use crate::config::{BackendMode, CacheConfig};
use crate::distributed::{
    Codec, DistributedBackend, DistributedTier, IdentityCodec, RedisBackend,
};
use inflight::InFlight;

// == Cache Manager ==
/// Two-tier cache handle.
///
/// Cloning is cheap and every clone shares the same tiers, so one instance can
/// be built at startup and handed to whatever needs it.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

struct Inner {
    local: RwLock<EntryStore>,
    distributed: Option<Arc<DistributedTier>>,
    clock: Arc<dyn Clock>,
    counters: StatsCounters,
    default_ttl: Duration,
    in_flight: Option<InFlight>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("distributed", &self.inner.distributed)
            .field("default_ttl", &self.inner.default_ttl)
            .field("single_flight", &self.inner.in_flight.is_some())
            .finish()
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheManager {
    // == Constructors ==
    /// Local-only manager with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> CacheManagerBuilder {
        CacheManagerBuilder::default()
    }

    /// Builds a manager from configuration, resolving the backend mode now.
    ///
    /// With a Redis URL, the connection probe runs in the background when a
    /// Tokio runtime is present; otherwise the first cache call connects.
    /// An unparsable URL logs a warning and falls back to local-only.
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut builder = Self::builder()
            .default_ttl(config.default_ttl_duration())
            .distributed_timeout(config.redis_timeout())
            .distributed_retry_interval(config.redis_reconnect_interval())
            .single_flight(config.single_flight);

        match &config.backend {
            BackendMode::MemoryOnly => {
                info!("Cache running in memory-only mode");
            }
            BackendMode::Redis { url } => match RedisBackend::open(url) {
                Ok(backend) => {
                    info!("Cache running in memory+redis mode");
                    builder = builder.distributed(Arc::new(backend));
                }
                Err(err) => {
                    warn!(error = %err, "Invalid Redis URL, cache running in memory-only mode");
                }
            },
        }

        let manager = builder.build();
        if let Some(tier) = &manager.inner.distributed {
            if tokio::runtime::Handle::try_current().is_ok() {
                tier.spawn_connect();
            }
        }
        manager
    }

    // == Get ==
    /// Returns a copy of the live value under `key`.
    ///
    /// Misses, tier failures and payloads that don't deserialize into `T` all
    /// come back as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.get_entry(key).await?;
        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %key, error = %err, "Cached value has unexpected shape, treating as miss");
                None
            }
        }
    }

    /// Returns a copy of the live entry under `key`, metadata included.
    pub async fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        let now = self.inner.clock.now_ms();

        if let Some(tier) = &self.inner.distributed {
            if let Some(entry) = tier.get(key).await {
                if !entry.is_expired(now) {
                    self.inner.counters.record_distributed_hit();
                    debug!(key = %key, "Cache hit (distributed)");
                    return Some(entry);
                }
            }
        }

        let found = self.inner.local.write().await.get(key, now);
        match found {
            Some(entry) => {
                self.inner.counters.record_local_hit();
                debug!(key = %key, "Cache hit (local)");
                Some(entry)
            }
            None => {
                self.inner.counters.record_miss();
                debug!(key = %key, "Cache miss");
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key` in both tiers and registers it under its tags.
    ///
    /// Failures are logged, never returned. A zero TTL removes the key.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: SetOptions) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %key, error = %err, "Value not serializable, skipping cache write");
                return;
            }
        };
        self.set_value(key, value, options).await;
    }

    /// Stores an already-serialized JSON value.
    pub async fn set_value(&self, key: &str, value: serde_json::Value, options: SetOptions) {
        let ttl = options.ttl.unwrap_or(self.inner.default_ttl);
        let ttl_millis = ttl.as_millis() as u64;
        if ttl_millis == 0 {
            debug!(key = %key, "Zero TTL write, removing key");
            self.delete(key).await;
            return;
        }

        let entry = CacheEntry::new(value, self.inner.clock.now_ms(), ttl_millis, options.tags);

        // Local tier is always written so a distributed outage still leaves a warm cache.
        self.inner
            .local
            .write()
            .await
            .insert(key.to_string(), entry.clone());

        if let Some(tier) = &self.inner.distributed {
            if !tier.set(key, &entry).await {
                debug!(key = %key, "Distributed write skipped, entry cached locally only");
            }
        }
        debug!(key = %key, ttl_ms = ttl_millis, tags = ?entry.tags, "Cache set");
    }

    // == Delete ==
    /// Removes `key` from both tiers. Deleting an absent key is a no-op.
    pub async fn delete(&self, key: &str) {
        self.inner.local.write().await.remove(key);
        if let Some(tier) = &self.inner.distributed {
            tier.delete(&[key.to_string()]).await;
        }
    }

    // == Invalidate By Tag ==
    /// Deletes every key registered under `tag` from both tiers, then drops
    /// the tag's own index entry.
    ///
    /// Returns how many distinct keys were targeted. Not transactional across
    /// the tag set; calling again after an interruption finishes the job.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut keys: BTreeSet<String> = self
            .inner
            .local
            .read()
            .await
            .keys_with_tag(tag)
            .into_iter()
            .collect();

        if let Some(tier) = &self.inner.distributed {
            if let Some(members) = tier.tag_members(tag).await {
                keys.extend(members);
            }
        }

        {
            let mut local = self.inner.local.write().await;
            for key in &keys {
                local.remove(key);
            }
        }

        if let Some(tier) = &self.inner.distributed {
            let keys: Vec<String> = keys.iter().cloned().collect();
            tier.delete(&keys).await;
            tier.remove_tag(tag).await;
        }

        info!(tag = %tag, count = keys.len(), "Invalidated cache entries by tag");
        keys.len()
    }

    // == Clear ==
    /// Drops everything in both tiers and resets the counters.
    pub async fn clear(&self) {
        self.inner.local.write().await.clear();
        if let Some(tier) = &self.inner.distributed {
            tier.flush_all().await;
        }
        self.inner.counters.reset();
        info!("Cache cleared");
    }

    // == Stats ==
    /// Introspection snapshot.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = {
            let local = self.inner.local.read().await;
            CacheStats {
                local_size: local.len(),
                local_keys: local.keys(),
                expired_removed: local.expired_removed(),
                ..Default::default()
            }
        };
        stats.distributed = DistributedStatus {
            configured: self.inner.distributed.is_some(),
            available: self.is_distributed_available(),
        };
        self.inner.counters.fill(&mut stats);
        stats
    }

    pub fn is_distributed_available(&self) -> bool {
        self.inner
            .distributed
            .as_ref()
            .map(|tier| tier.is_available())
            .unwrap_or(false)
    }

    // == Sweep ==
    /// Removes expired entries from the Entry Store. Returns the count removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.inner.clock.now_ms();
        self.inner.local.write().await.cleanup_expired(now)
    }

    // == Memoize ==
    /// Read-through caching.
    ///
    /// On a hit, returns the cached value without calling `producer`. On a
    /// miss, awaits `producer`, caches its `Ok` value under `key` and returns
    /// it. A producer error is returned unchanged and nothing is cached.
    ///
    /// Concurrent misses each run `producer` unless the manager was built with
    /// single-flight enabled.
    pub async fn memoize<T, E, F, Fut>(
        &self,
        key: &str,
        options: SetOptions,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }

        match &self.inner.in_flight {
            None => self.produce(key, options, producer).await,
            Some(registry) => {
                let _guard = registry.acquire(key).await;
                // Another caller may have filled the key while we waited.
                if let Some(hit) = self.get(key).await {
                    return Ok(hit);
                }
                self.produce(key, options, producer).await
            }
        }
    }

    async fn produce<T, E, F, Fut>(&self, key: &str, options: SetOptions, producer: F) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = producer().await?;
        self.set(key, &value, options).await;
        Ok(value)
    }

    /// The clock entries are stamped with.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }
}

// == Builder ==
/// Explicit construction of a [`CacheManager`].
pub struct CacheManagerBuilder {
    distributed: Option<Arc<dyn DistributedBackend>>,
    codec: Arc<dyn Codec>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    timeout: Duration,
    retry_interval: Duration,
    single_flight: bool,
}

impl Default for CacheManagerBuilder {
    fn default() -> Self {
        let config = CacheConfig::default();
        Self {
            distributed: None,
            codec: Arc::new(IdentityCodec),
            clock: Arc::new(SystemClock),
            default_ttl: config.default_ttl_duration(),
            timeout: config.redis_timeout(),
            retry_interval: config.redis_reconnect_interval(),
            single_flight: config.single_flight,
        }
    }
}

impl CacheManagerBuilder {
    /// Enables the distributed tier on top of the Entry Store.
    pub fn distributed(mut self, backend: Arc<dyn DistributedBackend>) -> Self {
        self.distributed = Some(backend);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// TTL for writes without one. Zero is ignored, the current default stays.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        if ttl.is_zero() {
            warn!("Ignoring zero default TTL");
        } else {
            self.default_ttl = ttl;
        }
        self
    }

    pub fn distributed_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn distributed_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn build(self) -> CacheManager {
        let distributed = self.distributed.map(|backend| {
            Arc::new(DistributedTier::new(
                backend,
                self.codec,
                self.timeout,
                self.retry_interval,
            ))
        });

        CacheManager {
            inner: Arc::new(Inner {
                local: RwLock::new(EntryStore::new()),
                distributed,
                clock: self.clock,
                counters: StatsCounters::new(),
                default_ttl: self.default_ttl,
                in_flight: self.single_flight.then(InFlight::new),
            }),
        }
    }
}
