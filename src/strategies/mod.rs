//! Strategy Helpers
//!
//! Call-site conveniences on top of [`CacheManager`](crate::manager::CacheManager).
//! They hold nothing but a manager handle and settings.

mod api;
mod query;
mod user;

pub use api::{ApiCache, DEFAULT_REFRESH_THRESHOLD};
pub use query::QueryCache;
pub use user::{data_type_tag, user_key, user_tag, UserCache};
