//! Cache Module
//!
//! Cache stores for ORM metadata and query results: a sharded file store,
//! a SQLite store and an in-memory store behind one trait, plus the
//! namespacing provider and backend selection.

mod array;
mod backend;
mod entry;
mod file;
mod lru;
mod provider;
pub mod sharding;
mod sqlite;
mod stats;
mod store;
pub mod writer;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use array::ArrayStore;
pub use backend::{open_provider, open_store};
pub use entry::{expiration_for, is_expired, unix_now, CacheEntry};
pub use file::{FileStore, DEFAULT_EXTENSION, DEFAULT_UMASK};
pub use lru::LruTracker;
pub use provider::CacheProvider;
pub use sqlite::{JournalState, SqliteOptions, SqliteStore, WalFallback};
pub use stats::CacheStats;
pub use store::CacheStore;
