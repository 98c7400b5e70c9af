//! User-scoped caching.
//!
//! Keys look like `user:{id}:{data_type}` and carry two tags, `user:{id}` and
//! `dataType:{data_type}`, so either axis can be dropped in one call.

use std::fmt::Display;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::manager::{CacheManager, SetOptions};

#[derive(Debug, Clone)]
pub struct UserCache {
    cache: CacheManager,
}

pub fn user_key(user_id: impl Display, data_type: &str) -> String {
    format!("user:{user_id}:{data_type}")
}

pub fn user_tag(user_id: impl Display) -> String {
    format!("user:{user_id}")
}

pub fn data_type_tag(data_type: &str) -> String {
    format!("dataType:{data_type}")
}

impl UserCache {
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    pub async fn get<T: DeserializeOwned>(&self, user_id: impl Display, data_type: &str) -> Option<T> {
        self.cache.get(&user_key(user_id, data_type)).await
    }

    /// Stores `value`; extra tags in `options` are kept alongside the user tags.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        user_id: impl Display,
        data_type: &str,
        value: &T,
        options: SetOptions,
    ) {
        let key = user_key(&user_id, data_type);
        self.cache
            .set(&key, value, scoped(options, &user_id, data_type))
            .await;
    }

    /// Memoizes `producer` under the user's key.
    pub async fn fetch<T, E, F, Fut>(
        &self,
        user_id: impl Display,
        data_type: &str,
        options: SetOptions,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = user_key(&user_id, data_type);
        self.cache
            .memoize(&key, scoped(options, &user_id, data_type), producer)
            .await
    }

    /// Drops everything cached for `user_id`.
    pub async fn invalidate_user(&self, user_id: impl Display) -> usize {
        self.cache.invalidate_by_tag(&user_tag(user_id)).await
    }

    /// Drops `data_type` for every user.
    pub async fn invalidate_data_type(&self, data_type: &str) -> usize {
        self.cache.invalidate_by_tag(&data_type_tag(data_type)).await
    }
}

fn scoped(options: SetOptions, user_id: &impl Display, data_type: &str) -> SetOptions {
    options
        .tag(user_tag(user_id))
        .tag(data_type_tag(data_type))
}
