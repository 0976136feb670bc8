//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check store behavior over arbitrary keys and payloads.

use proptest::prelude::*;

use crate::cache::sharding::ShardLayout;
use crate::cache::{ArrayStore, CacheStore, FileStore, SqliteStore, DEFAULT_UMASK};

// == Strategies ==
/// Any non-empty key, including ones far past the hex filename budget
fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_:\\[\\]\\\\]{1,64}",
        any::<String>().prop_filter("non-empty", |s| !s.is_empty()),
        "[a-z]{120,300}",
    ]
}

/// Printable keys; SQLite text keys stay free of NUL bytes
fn text_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[a-zA-Z0-9_:\\[\\]. -]{1,64}", "[a-z]{120,300}"]
}

fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

fn file_store() -> (tempfile::TempDir, FileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::with_options(dir.path(), ".dat", DEFAULT_UMASK).unwrap();
    (dir, store)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Saving then fetching before expiry returns the exact payload
    #[test]
    fn prop_file_store_round_trip(key in key_strategy(), payload in payload_strategy(), ttl in 0u64..10_000) {
        let (_dir, store) = file_store();

        prop_assert!(store.save(&key, &payload, ttl).unwrap());
        prop_assert_eq!(store.fetch(&key).unwrap(), Some(payload));
        prop_assert!(store.contains(&key).unwrap());
    }

    #[test]
    fn prop_array_store_round_trip(key in key_strategy(), payload in payload_strategy(), ttl in 0u64..10_000) {
        let store = ArrayStore::new();

        prop_assert!(store.save(&key, &payload, ttl).unwrap());
        prop_assert_eq!(store.fetch(&key).unwrap(), Some(payload));
    }

    // The same key always maps to the same file, inside its shard
    #[test]
    fn prop_shard_path_is_deterministic(key in key_strategy()) {
        let layout = ShardLayout::with_platform("/var/cache/orm", ".cache.data", false);
        let first = layout.path_for(&key);

        prop_assert_eq!(&first, &layout.path_for(&key));

        let shard = first.parent().unwrap();
        prop_assert_eq!(shard.parent().unwrap(), layout.base_dir());
        prop_assert_eq!(shard.file_name().unwrap().len(), 2);
        prop_assert!(first.file_name().unwrap().len() <= 255);
    }

    // Deleting twice, or deleting what never existed, succeeds
    #[test]
    fn prop_delete_is_idempotent(key in key_strategy(), payload in payload_strategy()) {
        let (_dir, store) = file_store();

        prop_assert!(store.delete(&key).unwrap());
        store.save(&key, &payload, 0).unwrap();
        prop_assert!(store.delete(&key).unwrap());
        prop_assert!(store.delete(&key).unwrap());
        prop_assert_eq!(store.fetch(&key).unwrap(), None);
    }

    // A bounded array store never holds more than its capacity
    #[test]
    fn prop_capacity_enforcement(
        keys in prop::collection::vec("[a-z]{1,8}", 1..200)
    ) {
        let max_entries = 50;
        let store = ArrayStore::with_capacity(max_entries);

        for key in keys {
            store.save(&key, b"v", 0).unwrap();
            prop_assert!(store.len() <= max_entries);
            prop_assert!(store.contains(&key).unwrap());
        }
    }
}

// Each case opens a database, so fewer of them
proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_sqlite_store_round_trip(key in text_key_strategy(), payload in payload_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("cache.db")).unwrap();

        prop_assert!(store.save(&key, &payload, 0).unwrap());
        prop_assert_eq!(store.fetch(&key).unwrap(), Some(payload));
        prop_assert!(store.contains(&key).unwrap());
    }
}
