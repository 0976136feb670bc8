//! Cache Statistics Module
//!
//! The statistics record a store reports. Every field is optional because
//! each backend only knows some of them.

use serde::Serialize;

// == Cache Stats ==
/// Cache statistics in the shape the ORM cache contract expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of successful fetches
    pub hits: Option<u64>,
    /// Number of fetches that found nothing (absent or expired)
    pub misses: Option<u64>,
    /// Unix timestamp the store started at
    pub uptime: Option<u64>,
    /// Bytes occupied by cached payloads
    pub memory_usage: Option<u64>,
    /// Bytes still available to the store
    pub memory_available: Option<u64>,
    /// Entries dropped to stay within capacity
    pub evictions: Option<u64>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates an empty record with every field unknown.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates hits / (hits + misses).
    ///
    /// Returns None when the store does not count hits or misses, and 0.0
    /// if no fetch has been made yet.
    pub fn hit_rate(&self) -> Option<f64> {
        let (hits, misses) = (self.hits?, self.misses?);
        let total = hits + misses;
        if total == 0 {
            Some(0.0)
        } else {
            Some(hits as f64 / total as f64)
        }
    }

    // == Merge Counters ==
    /// Fills hit/miss counters the store left unknown.
    pub fn with_counters(mut self, hits: u64, misses: u64) -> Self {
        self.hits.get_or_insert(hits);
        self.misses.get_or_insert(misses);
        self
    }
}
