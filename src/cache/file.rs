//! File Cache Store Module
//!
//! One file per key under a sharded directory tree. Each file starts with
//! the expiration timestamp on its own line (`0` = never) followed by the
//! raw payload bytes.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cache::sharding::ShardLayout;
use crate::cache::writer::{is_writable, AtomicWriter};
use crate::cache::{expiration_for, unix_now, CacheStats, CacheStore};
use crate::error::{CacheError, Result};

/// Extension used when none is configured explicitly.
pub const DEFAULT_EXTENSION: &str = ".cache.data";

/// Group-writable files and directories by default.
pub const DEFAULT_UMASK: u32 = 0o002;

// == File Store ==
/// Filesystem-backed cache store.
///
/// Every filesystem error past construction degrades to a miss or a `false`
/// return; the store never fails a caller because the disk misbehaved.
#[derive(Debug, Clone)]
pub struct FileStore {
    layout: ShardLayout,
    writer: AtomicWriter,
}

impl FileStore {
    // == Constructor ==
    /// Opens a store in `directory` with the default extension and umask.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(directory, DEFAULT_EXTENSION, DEFAULT_UMASK)
    }

    /// Opens a store, creating `directory` if needed.
    ///
    /// # Errors
    /// `CacheError::Configuration` when the directory cannot be created or
    /// is not writable.
    pub fn with_options(
        directory: impl AsRef<Path>,
        extension: &str,
        umask: u32,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        let writer = AtomicWriter::new(umask);

        writer.ensure_dir(directory).map_err(|_| {
            CacheError::Configuration(format!(
                "The directory \"{}\" does not exist and could not be created",
                directory.display()
            ))
        })?;
        if !is_writable(directory) {
            return Err(CacheError::Configuration(format!(
                "The directory \"{}\" is not writable",
                directory.display()
            )));
        }

        // Canonical only once it exists; path lengths are measured on it
        let base_dir = fs::canonicalize(directory).map_err(|err| {
            CacheError::Configuration(format!(
                "Cannot resolve directory \"{}\": {err}",
                directory.display()
            ))
        })?;

        info!(dir = %base_dir.display(), extension, "File cache store ready");

        Ok(Self {
            layout: ShardLayout::new(base_dir, extension),
            writer,
        })
    }

    /// The canonical base directory.
    pub fn directory(&self) -> &Path {
        self.layout.base_dir()
    }

    pub fn extension(&self) -> &str {
        self.layout.extension()
    }

    /// The file that holds (or would hold) `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.layout.path_for(key)
    }

    fn evict(&self, key: &str, path: &Path) {
        debug!(key, "Evicting stale cache file");
        let _ = fs::remove_file(path);
    }

    /// Walks the tree children-first, skipping the base directory itself.
    fn walk(&self) -> impl Iterator<Item = walkdir::DirEntry> {
        WalkDir::new(self.layout.base_dir())
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
    }
}

impl CacheStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        let Ok(content) = fs::read(&path) else {
            return Ok(None);
        };

        let (header, payload) = match content.iter().position(|b| *b == b'\n') {
            Some(newline) => (&content[..newline], &content[newline + 1..]),
            None => (&content[..], &[][..]),
        };

        if is_stale(parse_expiration(header)) {
            self.evict(key, &path);
            return Ok(None);
        }

        Ok(Some(payload.to_vec()))
    }

    fn contains(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        let Ok(file) = File::open(&path) else {
            return Ok(false);
        };

        let mut header = Vec::new();
        if BufReader::new(file).read_until(b'\n', &mut header).is_err() {
            return Ok(false);
        }

        if is_stale(parse_expiration(&header)) {
            self.evict(key, &path);
            return Ok(false);
        }

        Ok(true)
    }

    fn save(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<bool> {
        let expiration = expiration_for(ttl_seconds).unwrap_or(0);
        let mut content = format!("{expiration}\n").into_bytes();
        content.extend_from_slice(payload);

        let path = self.path_for(key);
        match self.writer.write(&path, &content) {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(key, error = %err, "Cache write failed");
                Ok(false)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        Ok(fs::remove_file(&path).is_ok() || !path.exists())
    }

    fn flush(&self) -> Result<bool> {
        for entry in self.walk() {
            let path = entry.path();
            if entry.file_type().is_dir() {
                // Only succeeds once empty; shards shared with other
                // extensions survive
                let _ = fs::remove_dir(path);
            } else if self.layout.owns(path) {
                let _ = fs::remove_file(path);
            }
        }

        debug!(dir = %self.directory().display(), "File cache flushed");
        Ok(true)
    }

    fn stats(&self) -> Option<CacheStats> {
        let usage: u64 = self
            .walk()
            .filter(|entry| entry.file_type().is_file() && self.layout.owns(entry.path()))
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum();

        Some(CacheStats {
            memory_usage: Some(usage),
            memory_available: fs2::available_space(self.directory()).ok(),
            ..CacheStats::default()
        })
    }
}

/// Reads the expiration line; anything unparsable counts as long expired.
fn parse_expiration(header: &[u8]) -> i64 {
    std::str::from_utf8(header)
        .ok()
        .and_then(|line| line.trim().parse().ok())
        .unwrap_or(-1)
}

fn is_stale(expiration: i64) -> bool {
    expiration != 0 && expiration < unix_now()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::with_options(dir.path(), ".dat", DEFAULT_UMASK).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_and_fetch() {
        let (_dir, store) = store();

        assert!(store.save("key1", b"value1", 0).unwrap());
        assert_eq!(store.fetch("key1").unwrap(), Some(b"value1".to_vec()));
        assert!(store.contains("key1").unwrap());
    }

    #[test]
    fn test_fetch_missing() {
        let (_dir, store) = store();

        assert_eq!(store.fetch("nonexistent").unwrap(), None);
        assert!(!store.contains("nonexistent").unwrap());
    }

    #[test]
    fn test_file_layout() {
        let (_dir, store) = store();
        store.save("user:42", b"payload-bytes", 60).unwrap();

        let path = store.path_for("user:42");
        assert!(path.starts_with(store.directory()));
        assert_eq!(path.parent().unwrap().parent().unwrap(), store.directory());

        let content = fs::read(&path).unwrap();
        let newline = content.iter().position(|b| *b == b'\n').unwrap();
        let expiration: i64 = std::str::from_utf8(&content[..newline])
            .unwrap()
            .parse()
            .unwrap();
        let expected = unix_now() + 60;
        assert!((expected - 2..=expected).contains(&expiration));
        assert_eq!(&content[newline + 1..], b"payload-bytes");
    }

    #[test]
    fn test_payload_with_newlines_round_trips() {
        let (_dir, store) = store();
        let payload = b"line one\nline two\r\n\n\x00binary".to_vec();

        store.save("multi", &payload, 0).unwrap();
        assert_eq!(store.fetch("multi").unwrap(), Some(payload));
    }

    #[test]
    fn test_empty_payload_is_a_hit() {
        let (_dir, store) = store();

        store.save("empty", b"", 0).unwrap();
        assert_eq!(store.fetch("empty").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_overwrite() {
        let (_dir, store) = store();

        store.save("key1", b"value1", 0).unwrap();
        store.save("key1", b"value2", 0).unwrap();
        assert_eq!(store.fetch("key1").unwrap(), Some(b"value2".to_vec()));
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let (_dir, store) = store();

        store.save("short", b"value", 1).unwrap();
        assert!(store.contains("short").unwrap());

        sleep(Duration::from_millis(2100));

        assert_eq!(store.fetch("short").unwrap(), None);
        assert!(!store.path_for("short").exists());
        assert!(!store.contains("short").unwrap());
    }

    #[test]
    fn test_garbage_header_is_a_miss() {
        let (_dir, store) = store();
        let path = store.path_for("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not-a-number\npayload").unwrap();

        assert_eq!(store.fetch("broken").unwrap(), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, store) = store();

        assert!(store.delete("never").unwrap());
        store.save("key1", b"value1", 0).unwrap();
        assert!(store.delete("key1").unwrap());
        assert!(store.delete("key1").unwrap());
        assert_eq!(store.fetch("key1").unwrap(), None);
    }

    #[test]
    fn test_flush_removes_files_and_shards() {
        let (_dir, store) = store();
        store.save("k1", b"a", 0).unwrap();
        store.save("k2", b"b", 0).unwrap();

        assert!(store.flush().unwrap());

        assert_eq!(store.fetch("k1").unwrap(), None);
        assert_eq!(store.fetch("k2").unwrap(), None);
        assert_eq!(fs::read_dir(store.directory()).unwrap().count(), 0);
    }

    #[test]
    fn test_flush_keeps_foreign_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let ours = FileStore::with_options(dir.path(), ".dat", DEFAULT_UMASK).unwrap();
        let theirs = FileStore::with_options(dir.path(), ".other", DEFAULT_UMASK).unwrap();

        ours.save("shared", b"a", 0).unwrap();
        theirs.save("shared", b"b", 0).unwrap();

        ours.flush().unwrap();

        assert_eq!(ours.fetch("shared").unwrap(), None);
        assert_eq!(theirs.fetch("shared").unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn test_stats_reports_usage() {
        let (_dir, store) = store();
        store.save("key1", b"12345", 0).unwrap();

        let stats = store.stats().unwrap();
        // "0\n" header plus five payload bytes
        assert_eq!(stats.memory_usage, Some(7));
        assert!(stats.memory_available.is_some());
        assert_eq!(stats.hits, None);
        assert_eq!(stats.misses, None);
        assert_eq!(stats.uptime, None);
    }

    #[test]
    fn test_constructor_rejects_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let result = FileStore::new(file.join("cache"));
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_constructor_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");

        let store = FileStore::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.extension(), DEFAULT_EXTENSION);
    }
}
