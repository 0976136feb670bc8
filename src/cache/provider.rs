//! Cache Provider Module
//!
//! The facade the ORM talks to. It namespaces ids, versions the namespace so
//! a whole namespace can be dropped without touching the backend, counts
//! hits and misses, and serializes typed values before they reach a store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheStats, CacheStore};
use crate::error::{CacheError, Result};

// == Cache Provider ==
/// Namespaced, versioned front for a [`CacheStore`].
pub struct CacheProvider {
    store: Box<dyn CacheStore>,
    namespace: String,
    /// Lazily loaded from the store
    namespace_version: Mutex<Option<u64>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for CacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheProvider")
            .field("backend", &self.store.name())
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl CacheProvider {
    // == Constructor ==
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self::from_boxed(Box::new(store))
    }

    pub fn from_boxed(store: Box<dyn CacheStore>) -> Self {
        Self {
            store,
            namespace: String::new(),
            namespace_version: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Sets the namespace prefixed to every id.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self.namespace_version = Mutex::new(None);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the store behind this provider.
    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    // == Fetch ==
    /// Fetches the payload for `id`; None is a miss.
    pub fn fetch(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let payload = self.store.fetch(&self.namespaced_id(id)?)?;
        let counter = if payload.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(payload)
    }

    /// Fetches several ids at once, returning only the ones found.
    pub fn fetch_multiple(&self, ids: &[&str]) -> Result<HashMap<String, Vec<u8>>> {
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(payload) = self.fetch(id)? {
                found.insert((*id).to_string(), payload);
            }
        }
        Ok(found)
    }

    /// Fetches and decodes a JSON-serialized value.
    pub fn fetch_value<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        match self.fetch(id)? {
            Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        self.store.contains(&self.namespaced_id(id)?)
    }

    // == Save ==
    /// Stores `payload` under `id` for `ttl_seconds` (0 = forever).
    pub fn save(&self, id: &str, payload: &[u8], ttl_seconds: u64) -> Result<bool> {
        self.store
            .save(&self.namespaced_id(id)?, payload, ttl_seconds)
    }

    /// Saves every item; true only if all writes succeeded.
    pub fn save_multiple(&self, items: &[(&str, &[u8])], ttl_seconds: u64) -> Result<bool> {
        let mut all_saved = true;
        for (id, payload) in items {
            all_saved &= self.save(id, payload, ttl_seconds)?;
        }
        Ok(all_saved)
    }

    /// Encodes `value` as JSON and stores it.
    pub fn save_value<T: Serialize>(&self, id: &str, value: &T, ttl_seconds: u64) -> Result<bool> {
        let payload = serde_json::to_vec(value)?;
        self.save(id, &payload, ttl_seconds)
    }

    // == Delete ==
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(&self.namespaced_id(id)?)
    }

    pub fn delete_multiple(&self, ids: &[&str]) -> Result<bool> {
        let mut all_deleted = true;
        for id in ids {
            all_deleted &= self.delete(id)?;
        }
        Ok(all_deleted)
    }

    /// Invalidates every id in the namespace by bumping its version.
    ///
    /// Old entries stay in the store until they expire or are flushed.
    pub fn delete_all(&self) -> Result<bool> {
        let next = self.namespace_version()? + 1;
        let saved = self
            .store
            .save(&self.namespace_key(), next.to_string().as_bytes(), 0)?;

        if saved {
            *self.version_slot()? = Some(next);
            debug!(namespace = %self.namespace, version = next, "Namespace invalidated");
        }
        Ok(saved)
    }

    /// Removes everything from the underlying store, all namespaces included.
    pub fn flush_all(&self) -> Result<bool> {
        let flushed = self.store.flush()?;
        *self.version_slot()? = None;
        Ok(flushed)
    }

    // == Stats ==
    /// Store statistics, with the provider's counters where the store has none.
    pub fn stats(&self) -> Option<CacheStats> {
        self.store.stats().map(|stats| {
            stats.with_counters(
                self.hits.load(Ordering::Relaxed),
                self.misses.load(Ordering::Relaxed),
            )
        })
    }

    fn namespace_key(&self) -> String {
        format!("CacheNamespaceKey[{}]", self.namespace)
    }

    fn namespaced_id(&self, id: &str) -> Result<String> {
        Ok(format!(
            "{}[{}][{}]",
            self.namespace,
            id,
            self.namespace_version()?
        ))
    }

    fn version_slot(&self) -> Result<std::sync::MutexGuard<'_, Option<u64>>> {
        self.namespace_version
            .lock()
            .map_err(|_| CacheError::Internal("namespace version lock poisoned".to_string()))
    }

    fn namespace_version(&self) -> Result<u64> {
        let mut slot = self.version_slot()?;
        if let Some(version) = *slot {
            return Ok(version);
        }

        let version = self
            .store
            .fetch(&self.namespace_key())?
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(1);
        *slot = Some(version);
        Ok(version)
    }
}
