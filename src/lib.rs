//! Tiered Cache - two-tier caching for expensive reads
//!
//! An in-process Entry Store that is always available, an optional Redis tier
//! shared across processes, tag-based group invalidation, read-through
//! memoization and a background sweep of expired local entries.
//!
//! ```ignore
//! let config = CacheConfig::from_env();
//! let cache = CacheManager::from_config(&config);
//! let cleanup = spawn_cleanup_task(cache.clone(), config.cleanup_interval_duration());
//!
//! let events: Vec<Event> = cache
//!     .memoize("events:upcoming", SetOptions::new().ttl_secs(600).tag("events"), || {
//!         db.upcoming_events()
//!     })
//!     .await?;
//! ```

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod distributed;
pub mod error;
pub mod logging;
pub mod manager;
pub mod models;
pub mod strategies;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheEntry, CacheStats};
pub use config::{BackendMode, CacheConfig};
pub use error::CacheError;
pub use manager::{CacheManager, CacheManagerBuilder, SetOptions};
pub use strategies::{ApiCache, QueryCache, UserCache};
pub use tasks::spawn_cleanup_task;
