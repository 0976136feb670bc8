//! Backend Module
//!
//! Backend selection.
//! Picks the store the process runs with. A backend that cannot be opened
//! never aborts startup: the process runs uncached and says so.

use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{ArrayStore, CacheProvider, CacheStore, FileStore, SqliteOptions, SqliteStore};
use crate::config::{BackendKind, Config};
use crate::error::Result;

// == Backend Selection ==
/// Opens the configured store, or None when running without a cache.
pub fn open_store(config: &Config) -> Option<Box<dyn CacheStore>> {
    let store = match config.backend {
        BackendKind::None => None,
        BackendKind::File => attempt("file", || open_file(config)),
        BackendKind::Sqlite => attempt("sqlite", || open_sqlite(config)),
        BackendKind::Array => Some(open_array(config)),
        BackendKind::Auto => attempt("file", || open_file(config))
            .or_else(|| attempt("sqlite", || open_sqlite(config))),
    };

    match &store {
        Some(store) => info!(backend = store.name(), "Cache backend selected"),
        None => warn!("Cache is not available, running without a cache: expect degraded performance"),
    }
    store
}

/// Opens the configured store and wraps it in a namespaced provider.
pub fn open_provider(config: &Config) -> Option<CacheProvider> {
    open_store(config)
        .map(|store| CacheProvider::from_boxed(store).with_namespace(config.namespace.clone()))
}

// == Openers ==
fn attempt<F>(backend: &str, open: F) -> Option<Box<dyn CacheStore>>
where
    F: FnOnce() -> Result<Box<dyn CacheStore>>,
{
    match open() {
        Ok(store) => Some(store),
        Err(err) => {
            warn!(backend, error = %err, "Cache backend unavailable");
            None
        }
    }
}

fn open_file(config: &Config) -> Result<Box<dyn CacheStore>> {
    let store = FileStore::with_options(&config.cache_dir, &config.extension, config.umask)?;
    Ok(Box::new(store))
}

fn open_sqlite(config: &Config) -> Result<Box<dyn CacheStore>> {
    let options = SqliteOptions {
        table: config.sqlite_table.clone(),
        busy_timeout: Duration::from_millis(config.sqlite_busy_timeout_ms),
        wal_retries: config.sqlite_wal_retries,
        wal_fallback: config.sqlite_wal_fallback,
        ..SqliteOptions::default()
    };
    Ok(Box::new(SqliteStore::open_with(&config.sqlite_path, options)?))
}

fn open_array(config: &Config) -> Box<dyn CacheStore> {
    match config.array_max_entries {
        0 => Box::new(ArrayStore::new()),
        max => Box::new(ArrayStore::with_capacity(max)),
    }
}
