//! Integration Tests for the two-tier manager
//!
//! Runs the public API against an in-memory distributed backend, including
//! outages and two managers sharing one backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tiered_cache::clock::ManualClock;
use tiered_cache::distributed::{DistributedBackend, RedisBackend};
use tiered_cache::error::{CacheError, Result};
use tiered_cache::{CacheEntry, CacheManager, SetOptions, UserCache};

// == Shared Backend ==

#[derive(Debug, Default)]
struct SharedBackend {
    values: Mutex<HashMap<String, Vec<u8>>>,
    sets: Mutex<HashMap<String, HashSet<String>>>,
    expiries: Mutex<HashMap<String, u64>>,
    down: AtomicBool,
}

impl SharedBackend {
    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn contains(&self, key: &str) -> bool {
        self.values.lock().unwrap().contains_key(key)
    }

    fn put_raw(&self, key: &str, payload: Vec<u8>) {
        self.values.lock().unwrap().insert(key.to_string(), payload);
    }
}

#[async_trait]
impl DistributedBackend for SharedBackend {
    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set_with_expiry(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<()> {
        self.check()?;
        self.values.lock().unwrap().insert(key.to_string(), payload);
        self.expiries
            .lock()
            .unwrap()
            .insert(key.to_string(), ttl_seconds);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        self.check()?;
        let mut values = self.values.lock().unwrap();
        let mut sets = self.sets.lock().unwrap();
        for key in keys {
            values.remove(key);
            sets.remove(key);
        }
        Ok(())
    }

    async fn members_of_set(&self, set_key: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .sets
            .lock()
            .unwrap()
            .get(set_key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<()> {
        self.check()?;
        self.sets
            .lock()
            .unwrap()
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn expire_set(&self, set_key: &str, ttl_seconds: u64) -> Result<()> {
        self.check()?;
        self.expiries
            .lock()
            .unwrap()
            .insert(set_key.to_string(), ttl_seconds);
        Ok(())
    }

    async fn flush_all(&self) -> Result<()> {
        self.check()?;
        self.values.lock().unwrap().clear();
        self.sets.lock().unwrap().clear();
        self.expiries.lock().unwrap().clear();
        Ok(())
    }
}

// == Helper Functions ==

fn manager_over(backend: &Arc<SharedBackend>) -> CacheManager {
    CacheManager::builder()
        .distributed(backend.clone())
        .distributed_retry_interval(Duration::ZERO)
        .build()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    plan: String,
}

fn profile(name: &str) -> Profile {
    Profile {
        name: name.to_string(),
        plan: "pro".to_string(),
    }
}

// == Two-Tier Reads & Writes ==

#[tokio::test]
async fn test_profile_scenario_end_to_end() {
    let backend = Arc::new(SharedBackend::default());
    let cache = manager_over(&backend);
    let options = SetOptions::new().ttl_secs(1800).tag("user:42");

    cache.set("user:42:profile", &profile("Ana"), options).await;
    assert_eq!(
        cache.get::<Profile>("user:42:profile").await,
        Some(profile("Ana"))
    );

    assert_eq!(cache.invalidate_by_tag("user:42").await, 1);
    assert_eq!(cache.get::<Profile>("user:42:profile").await, None);
    assert!(!backend.contains("user:42:profile"));
    assert!(!backend.contains("tag:user:42"));
}

#[tokio::test]
async fn test_writes_reach_both_tiers_with_native_expiry() {
    let backend = Arc::new(SharedBackend::default());
    let cache = manager_over(&backend);

    cache
        .set("events:upcoming", &vec![1, 2, 3], SetOptions::new().ttl_secs(600).tag("events"))
        .await;

    assert!(backend.contains("events:upcoming"));
    let expiries = backend.expiries.lock().unwrap().clone();
    assert_eq!(expiries.get("events:upcoming"), Some(&600));
    assert_eq!(expiries.get("tag:events"), Some(&600));
    assert_eq!(cache.stats().await.local_keys, vec!["events:upcoming".to_string()]);
    assert!(cache.is_distributed_available());
}

#[tokio::test]
async fn test_second_process_reads_shared_tier() {
    let backend = Arc::new(SharedBackend::default());
    let writer = manager_over(&backend);
    let reader = manager_over(&backend);

    writer
        .set("venue:9", &profile("Hall B"), SetOptions::new())
        .await;

    assert_eq!(reader.get::<Profile>("venue:9").await, Some(profile("Hall B")));
    let stats = reader.stats().await;
    assert_eq!(stats.distributed_hits, 1);
    assert_eq!(stats.local_size, 0);
}

#[tokio::test]
async fn test_distributed_value_takes_precedence() {
    let backend = Arc::new(SharedBackend::default());
    let cache = manager_over(&backend);
    cache.set("k", &"local", SetOptions::new()).await;

    let newer = CacheEntry::new(
        serde_json::json!("from another process"),
        tiered_cache::clock::current_timestamp_ms(),
        60_000,
        vec![],
    );
    backend.put_raw("k", serde_json::to_vec(&newer).unwrap());

    assert_eq!(
        cache.get::<String>("k").await.as_deref(),
        Some("from another process")
    );
}

#[tokio::test]
async fn test_invalidation_from_another_process_uses_shared_tag_set() {
    let backend = Arc::new(SharedBackend::default());
    let writer = manager_over(&backend);
    let admin = manager_over(&backend);

    writer
        .set("a", &1, SetOptions::new().tag("venue:1"))
        .await;
    writer
        .set("b", &2, SetOptions::new().tag("venue:1"))
        .await;

    assert_eq!(admin.invalidate_by_tag("venue:1").await, 2);
    assert!(!backend.contains("a"));
    assert!(!backend.contains("b"));
    assert_eq!(admin.get::<i32>("a").await, None);
}

#[tokio::test]
async fn test_corrupt_shared_payload_falls_back_and_is_evicted() {
    let backend = Arc::new(SharedBackend::default());
    let cache = manager_over(&backend);
    cache.set("k", &7, SetOptions::new()).await;

    backend.put_raw("k", b"\x00not json".to_vec());

    assert_eq!(cache.get::<i32>("k").await, Some(7));
    assert!(!backend.contains("k"));
}

// == Outages ==

#[tokio::test]
async fn test_outage_degrades_to_local_tier() {
    let backend = Arc::new(SharedBackend::default());
    backend.set_down(true);
    let cache = manager_over(&backend);

    cache
        .set("user:1:profile", &profile("Bo"), SetOptions::new().tag("user:1"))
        .await;
    assert_eq!(
        cache.get::<Profile>("user:1:profile").await,
        Some(profile("Bo"))
    );
    assert!(!cache.is_distributed_available());

    assert_eq!(cache.invalidate_by_tag("user:1").await, 1);
    assert_eq!(cache.get::<Profile>("user:1:profile").await, None);

    let stats = cache.stats().await;
    assert!(stats.distributed.configured);
    assert!(!stats.distributed.available);
}

#[tokio::test]
async fn test_expiry_and_size_hold_during_outage() {
    let backend = Arc::new(SharedBackend::default());
    backend.set_down(true);
    let clock = ManualClock::new(1_700_000_000_000);
    let cache = CacheManager::builder()
        .distributed(backend.clone())
        .clock(Arc::new(clock.clone()))
        .build();

    cache.set("short", &1, SetOptions::new().ttl_secs(1)).await;
    cache.set("a", &2, SetOptions::new().ttl_secs(60)).await;
    cache.set("b", &3, SetOptions::new().ttl_secs(60)).await;
    assert_eq!(cache.stats().await.local_size, 3);

    cache.delete("b").await;
    assert_eq!(cache.stats().await.local_size, 2);

    clock.advance(Duration::from_millis(1_000));
    assert_eq!(cache.get::<i32>("short").await, None);
    assert_eq!(cache.get::<i32>("a").await, Some(2));

    clock.advance(Duration::from_secs(60));
    cache.set("fresh", &4, SetOptions::new().ttl_secs(60)).await;
    assert_eq!(cache.sweep_expired().await, 1);
    assert_eq!(cache.stats().await.local_keys, vec!["fresh".to_string()]);
    assert!(!cache.is_distributed_available());
}

#[tokio::test]
async fn test_recovers_after_outage() {
    let backend = Arc::new(SharedBackend::default());
    let cache = manager_over(&backend);

    backend.set_down(true);
    cache.set("during", &1, SetOptions::new()).await;
    assert!(!cache.is_distributed_available());
    assert!(!backend.contains("during"));

    backend.set_down(false);
    cache.set("after", &2, SetOptions::new()).await;
    assert!(cache.is_distributed_available());
    assert!(backend.contains("after"));
    assert_eq!(cache.get::<i32>("during").await, Some(1));
}

#[tokio::test]
async fn test_memoize_during_outage_still_caches_locally() {
    let backend = Arc::new(SharedBackend::default());
    backend.set_down(true);
    let cache = manager_over(&backend);

    let first: std::result::Result<u32, String> = cache
        .memoize("query:count:{}", SetOptions::new(), || async { Ok(41) })
        .await;
    let second: std::result::Result<u32, String> = cache
        .memoize("query:count:{}", SetOptions::new(), || async { Ok(99) })
        .await;

    assert_eq!(first, Ok(41));
    assert_eq!(second, Ok(41));
}

#[tokio::test]
async fn test_memoize_propagates_producer_error_unchanged() {
    let backend = Arc::new(SharedBackend::default());
    let cache = manager_over(&backend);

    let result: anyhow::Result<Profile> = cache
        .memoize("user:5:profile", SetOptions::new(), || async {
            Err(anyhow::anyhow!("profile service returned 502"))
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "profile service returned 502");
    assert!(!backend.contains("user:5:profile"));
    assert_eq!(cache.stats().await.local_size, 0);
}

#[tokio::test]
async fn test_unreachable_redis_never_fails_callers() {
    let backend = RedisBackend::open("redis://127.0.0.1:1").unwrap();
    let cache = CacheManager::builder()
        .distributed(Arc::new(backend))
        .distributed_timeout(Duration::from_millis(200))
        .build();

    cache.set("k", &"v", SetOptions::new().tag("t")).await;
    assert_eq!(cache.get::<String>("k").await.as_deref(), Some("v"));
    assert_eq!(cache.invalidate_by_tag("t").await, 1);
    cache.clear().await;
    assert!(!cache.is_distributed_available());
}

// == Strategy Helpers Over Both Tiers ==

#[tokio::test]
async fn test_user_cache_invalidation_spans_processes() {
    let backend = Arc::new(SharedBackend::default());
    let web = UserCache::new(manager_over(&backend));
    let worker = UserCache::new(manager_over(&backend));

    web.set(42, "profile", &profile("Ana"), SetOptions::new()).await;
    web.set(42, "settings", &"dark", SetOptions::new()).await;
    web.set(7, "profile", &profile("Bo"), SetOptions::new()).await;

    assert_eq!(worker.invalidate_user(42).await, 2);
    assert_eq!(worker.get::<Profile>(42, "profile").await, None);
    assert_eq!(worker.get::<Profile>(7, "profile").await, Some(profile("Bo")));
}
