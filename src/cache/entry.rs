//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and tags.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// The serialized form is the distributed tier's wire format:
/// `{ "value", "createdAt", "ttlMillis", "tags" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Lifetime in milliseconds, counted from `created_at`
    pub ttl_millis: u64,
    /// Tags registered at write time
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// Duplicate tags are dropped, first occurrence wins.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `created_at` - Write time in Unix milliseconds
    /// * `ttl_millis` - Lifetime in milliseconds
    /// * `tags` - Tags used for group invalidation
    pub fn new(value: Value, created_at: u64, ttl_millis: u64, tags: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }

        Self {
            value,
            created_at,
            ttl_millis,
            tags: unique,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is live while `now - created_at < ttl_millis`; once the full TTL
    /// has elapsed it is expired. A clock that reads earlier than `created_at`
    /// counts as zero age.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.age_ms(now_ms) >= self.ttl_millis
    }

    /// Milliseconds since the entry was written.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.ttl_millis.saturating_sub(self.age_ms(now_ms))
    }

    /// Returns remaining TTL in whole seconds.
    pub fn ttl_remaining(&self, now_ms: u64) -> u64 {
        self.ttl_remaining_ms(now_ms) / 1000
    }

    /// Whether the entry carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
