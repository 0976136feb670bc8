//! Cache Store Module
//!
//! The capability every backend implements. Payloads are opaque bytes; the
//! caller serializes values before they reach a store.

use std::sync::Arc;

use crate::cache::CacheStats;
use crate::error::Result;

// == Cache Store ==
/// A synchronous key/value store with per-entry expiration.
///
/// Implementations block the calling thread for the duration of the
/// filesystem or database call. Cross-process safety comes from the backing
/// medium (atomic rename, SQLite locking), never from in-process locks.
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs and the stats endpoint.
    fn name(&self) -> &'static str;

    /// Returns the payload stored under `key`, or None on a miss.
    ///
    /// Expired entries count as misses and are evicted.
    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Tests whether a live entry exists, without reading its payload.
    fn contains(&self, key: &str) -> Result<bool>;

    /// Stores `payload` under `key`, replacing any previous entry.
    ///
    /// A `ttl_seconds` of 0 means the entry never expires. Returns
    /// `Ok(false)` when the write could not be completed.
    fn save(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<bool>;

    /// Removes `key`. Deleting an absent key succeeds.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every entry this store owns.
    fn flush(&self) -> Result<bool>;

    /// Reports statistics, or None if the backend has none.
    fn stats(&self) -> Option<CacheStats>;
}

/// Lets several providers share one store instance.
impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).fetch(key)
    }

    fn contains(&self, key: &str) -> Result<bool> {
        (**self).contains(key)
    }

    fn save(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<bool> {
        (**self).save(key, payload, ttl_seconds)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn flush(&self) -> Result<bool> {
        (**self).flush()
    }

    fn stats(&self) -> Option<CacheStats> {
        (**self).stats()
    }
}
