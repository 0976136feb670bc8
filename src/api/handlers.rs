//! API Handlers
//!
//! HTTP request handlers for the cache maintenance endpoints. Store calls
//! block, so every one of them runs on tokio's blocking pool.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{open_provider, CacheProvider};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, ContainsResponse, DeleteResponse, FlushResponse, HealthResponse, SaveQuery,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// `cache` is None when the process runs without a cache backend.
#[derive(Clone)]
pub struct AppState {
    pub cache: Option<Arc<CacheProvider>>,
    /// TTL applied when a save request does not name one
    pub default_ttl: u64,
}

impl AppState {
    /// Creates a new AppState serving the given provider.
    pub fn new(cache: CacheProvider) -> Self {
        Self {
            cache: Some(Arc::new(cache)),
            default_ttl: 0,
        }
    }

    /// State for a process running without any cache.
    pub fn uncached() -> Self {
        Self {
            cache: None,
            default_ttl: 0,
        }
    }

    pub fn with_default_ttl(mut self, default_ttl: u64) -> Self {
        self.default_ttl = default_ttl;
        self
    }

    /// Opens the configured backend, degrading to no cache if it fails.
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache: open_provider(config).map(Arc::new),
            default_ttl: config.default_ttl,
        }
    }

    pub fn backend(&self) -> Option<&'static str> {
        self.cache.as_ref().map(|cache| cache.backend())
    }

    /// Runs a store operation on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&CacheProvider) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let cache = self
            .cache
            .clone()
            .ok_or_else(|| CacheError::Unavailable("running without a cache".to_string()))?;

        tokio::task::spawn_blocking(move || op(&cache))
            .await
            .map_err(|err| CacheError::Internal(err.to_string()))?
    }
}

fn checked_key(key: String) -> Result<String> {
    match validate_key(&key) {
        Some(message) => Err(CacheError::InvalidRequest(message)),
        None => Ok(key),
    }
}

/// Handler for PUT /entries/:key
///
/// Stores the raw request body under the key.
pub async fn save_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SaveQuery>,
    body: Bytes,
) -> Result<Json<SetResponse>> {
    let key = checked_key(key)?;
    let ttl = query.ttl.unwrap_or(state.default_ttl);

    let id = key.clone();
    let saved = state
        .run(move |cache| cache.save(&id, &body, ttl))
        .await?;

    Ok(Json(SetResponse::new(key, saved)))
}

/// Handler for GET /entries/:key
///
/// Returns the stored bytes as `application/octet-stream`.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let key = checked_key(key)?;

    let id = key.clone();
    match state.run(move |cache| cache.fetch(&id)).await? {
        Some(payload) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            payload,
        )
            .into_response()),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /entries/:key/exists
pub async fn contains_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ContainsResponse>> {
    let key = checked_key(key)?;

    let id = key.clone();
    let exists = state.run(move |cache| cache.contains(&id)).await?;

    Ok(Json(ContainsResponse { key, exists }))
}

/// Handler for DELETE /entries/:key
///
/// Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let key = checked_key(key)?;

    let id = key.clone();
    state.run(move |cache| cache.delete(&id)).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /entries
///
/// Flushes the whole backend, every namespace included.
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    let done = state.run(|cache| cache.flush_all()).await?;

    Ok(Json(FlushResponse {
        message: "Cache flushed".to_string(),
        done,
    }))
}

/// Handler for POST /namespace/invalidate
pub async fn invalidate_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    let done = state.run(|cache| cache.delete_all()).await?;

    Ok(Json(FlushResponse {
        message: "Namespace invalidated".to_string(),
        done,
    }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let (backend, stats) = state
        .run(|cache| Ok((cache.backend(), cache.stats())))
        .await?;

    Ok(Json(StatsResponse::new(backend, stats)))
}

/// Handler for GET /health
///
/// Always answers; reports "degraded" when no cache backend is running.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::for_backend(state.backend()))
}
