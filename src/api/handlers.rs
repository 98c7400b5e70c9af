//! API Handlers
//!
//! HTTP request handlers for each cache admin endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::manager::CacheManager;
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, InvalidateResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache handle
    pub cache: CacheManager,
}

impl AppState {
    /// Creates a new AppState around an existing manager.
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(CacheManager::from_config(config))
    }
}

/// Handler for `PUT /entries`
///
/// Stores a JSON value with optional TTL and tags.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options();
    state.cache.set_value(&req.key, req.value, options).await;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for `GET /entries/:key`
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let entry = state
        .cache
        .get_entry(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;
    let now = state.cache.clock().now_ms();

    Ok(Json(GetResponse::from_entry(key, entry, now)))
}

/// Handler for `DELETE /entries/:key`
///
/// Idempotent: deleting a missing key also succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.delete(&key).await;
    Json(DeleteResponse::new(key))
}

/// Handler for `DELETE /entries`
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::cleared())
}

/// Handler for `POST /tags/:tag/invalidate`
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<InvalidateResponse> {
    let invalidated = state.cache.invalidate_by_tag(&tag).await;
    Json(InvalidateResponse { tag, invalidated })
}

/// Handler for `GET /stats`
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

/// Handler for `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let distributed = state.cache.stats().await.distributed;
    Json(HealthResponse::new(distributed.configured, distributed.available))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> AppState {
        AppState::new(CacheManager::new())
    }

    fn set_request(key: &str, tags: &[&str]) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value: json!({"venue": "Hall A"}),
            ttl: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = state();

        let result = set_handler(State(state.clone()), Json(set_request("test_key", &[]))).await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"venue": "Hall A"}));
        assert!(response.ttl_remaining >= 3599 && response.ttl_remaining <= 3600);
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let result = get_handler(State(state()), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();
        set_handler(State(state.clone()), Json(set_request("to_delete", &[])))
            .await
            .unwrap();

        delete_handler(State(state.clone()), Path("to_delete".to_string())).await;

        let result = get_handler(State(state), Path("to_delete".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let state = state();
        set_handler(State(state.clone()), Json(set_request("a", &["venue:1"])))
            .await
            .unwrap();
        set_handler(State(state.clone()), Json(set_request("b", &["venue:2"])))
            .await
            .unwrap();

        let response = invalidate_handler(State(state.clone()), Path("venue:1".to_string())).await;
        assert_eq!(response.invalidated, 1);
        assert_eq!(state.cache.stats().await.local_keys, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_stats_and_health_handlers() {
        let state = state();

        let stats = stats_handler(State(state.clone())).await;
        assert_eq!(stats.stats.hits, 0);
        assert_eq!(stats.hit_rate, 0.0);

        let health = health_handler(State(state)).await;
        assert_eq!(health.status, "healthy");
        assert!(!health.distributed_available);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let result = set_handler(State(state()), Json(set_request("", &[]))).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
