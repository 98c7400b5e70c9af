//! Entry Store Module
//!
//! The always-available in-process tier: a HashMap of entries with lazy expiry
//! on read and eager expiry through `cleanup_expired`.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Entry Store ==
/// In-process key-value tier.
///
/// Time is passed in by the caller so the store itself stays clock-agnostic.
/// Tag membership is derived from each entry's `tags` field.
#[derive(Debug, Default)]
pub struct EntryStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Entries dropped because their TTL elapsed (lazy or swept)
    expired_removed: u64,
}

impl EntryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Stores an entry, replacing any previous entry under `key` wholesale.
    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    // == Get ==
    /// Returns a copy of the live entry under `key`.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&mut self, key: &str, now_ms: u64) -> Option<CacheEntry> {
        let expired = self.entries.get(key)?.is_expired(now_ms);
        if expired {
            self.entries.remove(key);
            self.expired_removed += 1;
            return None;
        }
        self.entries.get(key).cloned()
    }

    // == Remove ==
    /// Removes an entry by key. Returns whether something was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Tag Lookup ==
    /// Keys of all physically present entries carrying `tag`.
    ///
    /// Expired entries are included so invalidation also clears them.
    pub fn keys_with_tag(&self, tag: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.has_tag(tag))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now_ms));
        let removed = before - self.entries.len();
        self.expired_removed += removed as u64;
        removed
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Keys ==
    /// Sorted list of physically present keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total number of entries dropped for expiry.
    pub fn expired_removed(&self) -> u64 {
        self.expired_removed
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
