//! Distributed Store Adapter
//!
//! [`DistributedBackend`] is the raw remote store. [`DistributedTier`] wraps one
//! so every call is time-bounded and failure-isolated: errors are logged, the
//! tier is marked unavailable, and the caller just sees a miss or `false`.

mod codec;
mod redis_backend;

pub use redis_backend::RedisBackend;
pub use codec::{Codec, IdentityCodec};

use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{tag_set_key, CacheEntry};
use crate::error::{CacheError, Result};

// == Backend Trait ==
/// Network-backed key-value store.
///
/// Implementations report failures through `Err`; they never need to retry.
#[async_trait]
pub trait DistributedBackend: Send + Sync + Debug {
    /// Availability probe (`PING`).
    async fn ping(&self) -> Result<()>;
    /// `GET key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// `SETEX key ttl payload`
    async fn set_with_expiry(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<()>;
    /// `DEL key...`
    async fn delete(&self, keys: &[String]) -> Result<()>;
    /// `SMEMBERS set_key`
    async fn members_of_set(&self, set_key: &str) -> Result<Vec<String>>;
    /// `SADD set_key member`
    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<()>;
    /// `EXPIRE set_key ttl`
    async fn expire_set(&self, set_key: &str, ttl_seconds: u64) -> Result<()>;
    /// `FLUSHALL`
    async fn flush_all(&self) -> Result<()>;
}

// == Distributed Tier ==
/// Failure-isolating wrapper around a [`DistributedBackend`].
///
/// Starts out unavailable. Any successful call marks it available, any failed
/// call marks it unavailable. While unavailable, calls are skipped until
/// `retry_interval` has passed since the last failure, then one is let through
/// as a probe.
#[derive(Debug)]
pub struct DistributedTier {
    backend: Arc<dyn DistributedBackend>,
    codec: Arc<dyn Codec>,
    timeout: Duration,
    retry_interval: Duration,
    available: AtomicBool,
    last_failure: Mutex<Option<Instant>>,
}

impl DistributedTier {
    pub fn new(
        backend: Arc<dyn DistributedBackend>,
        codec: Arc<dyn Codec>,
        timeout: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            backend,
            codec,
            timeout,
            retry_interval,
            available: AtomicBool::new(false),
            last_failure: Mutex::new(None),
        }
    }

    /// Whether the last call against the backend succeeded.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    // == Connect ==
    /// Pings the backend once. Returns the resulting availability.
    pub async fn try_connect(&self) -> bool {
        let reachable = self.call("PING", self.backend.ping()).await.is_some();
        if reachable {
            info!("Distributed cache tier connected");
        }
        reachable
    }

    /// Pings the backend in the background so construction never waits on the network.
    pub fn spawn_connect(self: &Arc<Self>) -> JoinHandle<()> {
        let tier = Arc::clone(self);
        tokio::spawn(async move {
            if !tier.try_connect().await {
                warn!("Distributed cache tier not reachable, serving from local tier");
            }
        })
    }

    // == Value Lifecycle ==
    /// Fetches and decodes the entry under `key`.
    ///
    /// An undecodable payload is deleted and reported as absent.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let payload = self.call("GET", self.backend.get(key)).await.flatten()?;

        match self.decode(payload) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(key = %key, error = %err, "Evicting corrupt distributed cache entry");
                self.delete(&[key.to_string()]).await;
                None
            }
        }
    }

    /// Writes `entry` with native expiry and registers it under each tag set.
    pub async fn set(&self, key: &str, entry: &CacheEntry) -> bool {
        let payload = match self.encode(entry) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to encode cache entry");
                return false;
            }
        };
        let ttl_seconds = ttl_seconds_for(entry.ttl_millis);

        if self
            .call("SETEX", self.backend.set_with_expiry(key, payload, ttl_seconds))
            .await
            .is_none()
        {
            return false;
        }

        for tag in &entry.tags {
            let set_key = tag_set_key(tag);
            if self
                .call("SADD", self.backend.add_to_set(&set_key, key))
                .await
                .is_none()
            {
                return false;
            }
            // Tag set lives as long as the newest entry registered under it.
            if self
                .call("EXPIRE", self.backend.expire_set(&set_key, ttl_seconds))
                .await
                .is_none()
            {
                return false;
            }
        }
        true
    }

    /// Deletes `keys`. Returns whether the call reached the backend.
    pub async fn delete(&self, keys: &[String]) -> bool {
        if keys.is_empty() {
            return true;
        }
        self.call("DEL", self.backend.delete(keys)).await.is_some()
    }

    // == Tag Index ==
    /// Keys registered under `tag`, or `None` if the tier couldn't answer.
    pub async fn tag_members(&self, tag: &str) -> Option<Vec<String>> {
        let set_key = tag_set_key(tag);
        self.call("SMEMBERS", self.backend.members_of_set(&set_key))
            .await
    }

    /// Drops the tag set itself.
    pub async fn remove_tag(&self, tag: &str) -> bool {
        self.delete(&[tag_set_key(tag)]).await
    }

    /// `FLUSHALL`
    pub async fn flush_all(&self) -> bool {
        self.call("FLUSHALL", self.backend.flush_all()).await.is_some()
    }

    // == Failure Isolation ==
    async fn call<T, F>(&self, op: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.should_attempt() {
            debug!(op, "Skipping distributed tier call while backing off");
            return None;
        }

        let outcome = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(value) => {
                self.mark_available();
                Some(value)
            }
            Err(err) => {
                self.mark_unavailable(op, &err);
                None
            }
        }
    }

    fn should_attempt(&self) -> bool {
        if self.is_available() {
            return true;
        }
        match *self.lock_last_failure() {
            Some(at) => at.elapsed() >= self.retry_interval,
            None => true,
        }
    }

    fn mark_available(&self) {
        if !self.available.swap(true, Ordering::SeqCst) {
            debug!("Distributed cache tier available");
        }
        *self.lock_last_failure() = None;
    }

    fn mark_unavailable(&self, op: &str, err: &CacheError) {
        let was_available = self.available.swap(false, Ordering::SeqCst);
        *self.lock_last_failure() = Some(Instant::now());
        if was_available {
            warn!(op, error = %err, "Distributed cache tier became unavailable");
        } else {
            debug!(op, error = %err, "Distributed cache tier still unavailable");
        }
    }

    fn lock_last_failure(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        // The guarded value is a plain timestamp, a poisoned lock is still usable.
        self.last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn encode(&self, entry: &CacheEntry) -> Result<Vec<u8>> {
        let raw = serde_json::to_vec(entry)?;
        self.codec.compress(raw)
    }

    fn decode(&self, payload: Vec<u8>) -> Result<CacheEntry> {
        let raw = self.codec.decompress(payload)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Whole seconds for `SETEX`/`EXPIRE`, rounded up and never zero.
pub fn ttl_seconds_for(ttl_millis: u64) -> u64 {
    ttl_millis.div_ceil(1000).max(1)
}
