//! Cache Module
//!
//! In-process building blocks: entries, the Entry Store tier and statistics.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::{CacheStats, DistributedStatus, StatsCounters};
pub use store::EntryStore;

// == Public Constants ==
/// Maximum allowed key length in bytes for keys submitted over HTTP
pub const MAX_KEY_LENGTH: usize = 256;

/// TTL applied when a write doesn't specify one, in seconds
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Prefix of distributed tag-set keys (`tag:{name}`)
pub const TAG_SET_PREFIX: &str = "tag:";

/// Distributed key holding the members of `tag`.
pub fn tag_set_key(tag: &str) -> String {
    format!("{TAG_SET_PREFIX}{tag}")
}
