//! Response DTOs for the cache maintenance API
//!
//! Defines the structure of outgoing JSON response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for `PUT /entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
    /// False when the backend could not complete the write
    pub saved: bool,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, saved: bool) -> Self {
        let key = key.into();
        let message = if saved {
            format!("Key '{}' saved", key)
        } else {
            format!("Key '{}' could not be saved", key)
        };
        Self {
            message,
            key,
            saved,
        }
    }
}

/// Response body for `GET /entries/:key/exists`
#[derive(Debug, Clone, Serialize)]
pub struct ContainsResponse {
    pub key: String,
    pub exists: bool,
}

/// Response body for `DELETE /entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted", key),
            key,
        }
    }
}

/// Response body for `DELETE /entries` and `POST /namespace/invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    pub message: String,
    pub done: bool,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Backend serving the cache
    pub backend: String,
    /// Null when the backend keeps no statistics
    pub stats: Option<CacheStats>,
    pub hit_rate: Option<f64>,
}

impl StatsResponse {
    pub fn new(backend: impl Into<String>, stats: Option<CacheStats>) -> Self {
        let hit_rate = stats.as_ref().and_then(CacheStats::hit_rate);
        Self {
            backend: backend.into(),
            stats,
            hit_rate,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when running without a cache
    pub status: String,
    pub backend: Option<String>,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn for_backend(backend: Option<&str>) -> Self {
        let status = if backend.is_some() {
            "healthy"
        } else {
            "degraded"
        };
        Self {
            status: status.to_string(),
            backend: backend.map(str::to_string),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
