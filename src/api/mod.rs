//! API Module
//!
//! Admin HTTP routes over a [`CacheManager`](crate::manager::CacheManager),
//! meant to be nested into the host application's router.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
