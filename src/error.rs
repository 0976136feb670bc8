//! Error types for the cache stores
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for cache stores and the maintenance API.
///
/// Filesystem failures inside file-store operations never show up here; they
/// degrade to misses or `false` returns instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store cannot be constructed (directory or database unusable)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Journal mode switch kept hitting lock contention
    #[error("Database still locked after {attempts} attempts: {source}")]
    TransientLock {
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite prepare/execute failure
    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// Typed value could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A built-in pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No cache backend is running
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Unavailable(_) | CacheError::TransientLock { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Configuration(_)
            | CacheError::Query(_)
            | CacheError::Pattern(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache crate.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::InvalidRequest("k".into()), StatusCode::BAD_REQUEST),
            (
                CacheError::Unavailable("none".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CacheError::Configuration("dir".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_transient_lock_message() {
        let err = CacheError::TransientLock {
            attempts: 3,
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
