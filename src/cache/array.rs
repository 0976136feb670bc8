//! Array Store Module
//!
//! In-process store: a map of entries with lazy expiration, optional LRU
//! capacity, and the only hit/miss/uptime counters among the backends.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::cache::{unix_now, CacheEntry, CacheStats, CacheStore, LruTracker};
use crate::error::{CacheError, Result};

#[derive(Debug, Default)]
struct ArrayState {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ArrayState {
    /// Drops `key` if present and expired; true when a live entry remains.
    fn retain_live(&mut self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.lru.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}

// == Array Store ==
/// Memory-backed cache store.
#[derive(Debug)]
pub struct ArrayStore {
    state: Mutex<ArrayState>,
    /// Maximum number of entries, None = unbounded
    max_entries: Option<usize>,
    started_at: i64,
}

impl ArrayStore {
    // == Constructor ==
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self::bounded(None)
    }

    /// Creates a store evicting the least recently used entry past `max_entries`.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self::bounded(Some(max_entries.max(1)))
    }

    fn bounded(max_entries: Option<usize>) -> Self {
        Self {
            state: Mutex::new(ArrayState::default()),
            max_entries,
            started_at: unix_now(),
        }
    }

    // == Length ==
    /// Number of entries held, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.state().map(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> Result<MutexGuard<'_, ArrayState>> {
        self.state
            .lock()
            .map_err(|_| CacheError::Internal("array store lock poisoned".to_string()))
    }
}

impl Default for ArrayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for ArrayStore {
    fn name(&self) -> &'static str {
        "array"
    }

    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut state = self.state()?;
        if !state.retain_live(key) {
            state.misses += 1;
            return Ok(None);
        }

        state.hits += 1;
        state.lru.touch(key);
        Ok(state.entries.get(key).map(|entry| entry.payload.clone()))
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.state()?.retain_live(key))
    }

    fn save(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<bool> {
        let mut state = self.state()?;
        let is_overwrite = state.entries.contains_key(key);

        if let Some(max) = self.max_entries {
            while !is_overwrite && state.entries.len() >= max {
                let Some(evicted) = state.lru.evict_oldest() else {
                    break;
                };
                state.entries.remove(&evicted);
                state.evictions += 1;
                debug!(key = %evicted, "Evicted least recently used entry");
            }
        }

        state
            .entries
            .insert(key.to_string(), CacheEntry::new(payload.to_vec(), ttl_seconds));
        state.lru.touch(key);
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.state()?;
        state.entries.remove(key);
        state.lru.remove(key);
        Ok(true)
    }

    fn flush(&self) -> Result<bool> {
        let mut state = self.state()?;
        state.entries.clear();
        state.lru.clear();
        Ok(true)
    }

    fn stats(&self) -> Option<CacheStats> {
        let state = self.state().ok()?;
        Some(CacheStats {
            hits: Some(state.hits),
            misses: Some(state.misses),
            uptime: u64::try_from(self.started_at).ok(),
            evictions: self.max_entries.map(|_| state.evictions),
            ..CacheStats::default()
        })
    }
}
