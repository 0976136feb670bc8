//! ORM Cache - result and metadata cache stores for an ORM
//!
//! Provides a sharded file store, a SQLite store and an in-memory store
//! behind a namespaced provider, a slow query log, and a small HTTP
//! maintenance API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod query_log;

pub use api::AppState;
pub use cache::{CacheProvider, CacheStore};
pub use config::Config;
pub use error::{CacheError, Result};
pub use query_log::QueryLogger;
