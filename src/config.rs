//! Configuration Module
//!
//! Loads cache configuration from environment variables and resolves which
//! storage tiers are active before the manager is built.

use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_TTL_SECONDS;
use crate::strategies::DEFAULT_REFRESH_THRESHOLD;

// == Backend Mode ==
/// Storage tiers selected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMode {
    /// Entry Store only.
    MemoryOnly,
    /// Entry Store plus a Redis distributed tier.
    Redis { url: String },
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Which tiers to run
    pub backend: BackendMode,
    /// Default TTL in seconds for writes that don't specify one
    pub default_ttl: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Upper bound on any single distributed tier call, in milliseconds
    pub redis_timeout_ms: u64,
    /// Minimum delay between reconnect attempts after a lost connection, in seconds
    pub redis_reconnect_secs: u64,
    /// Fraction of TTL after which API responses are refreshed in the background
    pub refresh_threshold: f64,
    /// Coalesce concurrent `memoize` misses on the same key
    pub single_flight: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_REDIS_URL` / `REDIS_URL` - Enables the distributed tier (default: unset)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds, zero ignored (default: 3600)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds, zero ignored (default: 300)
    /// - `CACHE_REDIS_TIMEOUT_MS` - Per-call timeout (default: 500)
    /// - `CACHE_REDIS_RECONNECT_SECS` - Reconnect backoff (default: 5)
    /// - `CACHE_REFRESH_THRESHOLD` - Background refresh fraction (default: 0.8)
    /// - `CACHE_SINGLE_FLIGHT` - `true`/`1` to coalesce misses (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend = env::var("CACHE_REDIS_URL")
            .or_else(|_| env::var("REDIS_URL"))
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .map(|url| BackendMode::Redis { url })
            .unwrap_or(BackendMode::MemoryOnly);

        Self {
            backend,
            default_ttl: parse_var::<u64>("CACHE_DEFAULT_TTL")
                .filter(|ttl| *ttl > 0)
                .unwrap_or(defaults.default_ttl),
            cleanup_interval: parse_var::<u64>("CACHE_CLEANUP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.cleanup_interval),
            redis_timeout_ms: parse_var::<u64>("CACHE_REDIS_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.redis_timeout_ms),
            redis_reconnect_secs: parse_var("CACHE_REDIS_RECONNECT_SECS")
                .unwrap_or(defaults.redis_reconnect_secs),
            refresh_threshold: parse_var::<f64>("CACHE_REFRESH_THRESHOLD")
                .filter(|t| *t > 0.0 && *t <= 1.0)
                .unwrap_or(defaults.refresh_threshold),
            single_flight: env::var("CACHE_SINGLE_FLIGHT")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(defaults.single_flight),
        }
    }

    /// Local-only configuration, mainly for tests and tools.
    pub fn memory_only() -> Self {
        Self::default()
    }

    /// Configuration with the Redis tier enabled at `url`.
    pub fn with_redis(url: impl Into<String>) -> Self {
        Self {
            backend: BackendMode::Redis { url: url.into() },
            ..Self::default()
        }
    }

    pub fn default_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn cleanup_interval_duration(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }

    pub fn redis_reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.redis_reconnect_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::MemoryOnly,
            default_ttl: DEFAULT_TTL_SECONDS,
            cleanup_interval: 300,
            redis_timeout_ms: 500,
            redis_reconnect_secs: 5,
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
            single_flight: false,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
