//! Query memoization.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::manager::{CacheManager, SetOptions};

/// Memoizes arbitrary producers such as database queries.
#[derive(Debug, Clone)]
pub struct QueryCache {
    cache: CacheManager,
}

impl QueryCache {
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    /// Key of the form `query:{name}:{params as JSON}`.
    pub fn query_key<P: Serialize + ?Sized>(name: &str, params: &P) -> String {
        match serde_json::to_string(params) {
            Ok(params) => format!("query:{name}:{params}"),
            Err(_) => format!("query:{name}"),
        }
    }

    /// Returns the cached result for `key` or runs `query` and caches it.
    /// Query errors are returned unchanged.
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, options: SetOptions, query: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cache.memoize(key, options, query).await
    }

    /// Drops every cached result tagged with `tag`.
    pub async fn invalidate(&self, tag: &str) -> usize {
        self.cache.invalidate_by_tag(tag).await
    }
}
