//! API Routes
//!
//! Builds the admin router. Host applications nest it under a prefix of their
//! choosing, e.g. `app.nest("/admin/cache", create_router(state))`.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, health_handler, invalidate_handler, set_handler,
    stats_handler, AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /entries` - Store a JSON value with optional TTL and tags
/// - `DELETE /entries` - Clear both tiers
/// - `GET /entries/:key` - Read a live entry
/// - `DELETE /entries/:key` - Delete a key
/// - `POST /tags/:tag/invalidate` - Drop every key carrying a tag
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Tier health
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/entries", put(set_handler).delete(clear_handler))
        .route("/entries/:key", get(get_handler).delete(delete_handler))
        .route("/tags/:tag/invalidate", post(invalidate_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
