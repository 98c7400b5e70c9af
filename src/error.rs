//! Error types for the cache subsystem
//!
//! Infrastructure failures are represented here so they can be logged and
//! recovered at the tier boundary. Only the admin routes ever surface them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache subsystem.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found (or expired) in every tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Distributed tier is not configured or not connected
    #[error("Distributed tier unavailable: {0}")]
    Unavailable(String),

    /// Distributed tier call exceeded the operation timeout
    #[error("Distributed tier timed out after {0} ms")]
    Timeout(u64),

    /// Protocol or connection error reported by the backend
    #[error("Backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Payload could not be serialized or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Codec failed to encode or decode a payload.
    ///
    /// The error [`Codec`](crate::distributed::Codec) implementations return;
    /// the distributed tier treats it like a corrupt payload.
    #[error("Codec error: {0}")]
    Codec(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Unavailable(_) | CacheError::Timeout(_) | CacheError::Backend(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Serialization(_) | CacheError::Codec(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = CacheError::NotFound("k".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_backend_failures_map_to_503() {
        let response = CacheError::Timeout(500).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = CacheError::Unavailable("no url".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_serialization_error_converts() {
        let err: CacheError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
