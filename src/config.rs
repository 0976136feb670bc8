//! Configuration Module
//!
//! Loads backend selection and store parameters from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{WalFallback, DEFAULT_EXTENSION, DEFAULT_UMASK};
use crate::error::{CacheError, Result};

/// Which cache backend the process should run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// File store first, then SQLite, then nothing
    Auto,
    File,
    Sqlite,
    Array,
    /// Run without a cache
    None,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "file" | "filesystem" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            "array" | "memory" => Ok(Self::Array),
            "none" => Ok(Self::None),
            other => Err(CacheError::Configuration(format!(
                "Cache backend \"{other}\" does not exist"
            ))),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend to open at startup
    pub backend: BackendKind,
    /// Base directory of the file store
    pub cache_dir: PathBuf,
    /// Extension appended to every cache file
    pub extension: String,
    /// Permission mask for created files and directories
    pub umask: u32,
    /// SQLite database file
    pub sqlite_path: PathBuf,
    /// SQLite table holding the entries
    pub sqlite_table: String,
    /// How long a SQLite call waits on a lock, in milliseconds
    pub sqlite_busy_timeout_ms: u64,
    /// Attempts at switching the journal to WAL before giving up
    pub sqlite_wal_retries: u32,
    /// What to do once the WAL retries are exhausted
    pub sqlite_wal_fallback: WalFallback,
    /// Capacity of the in-memory store, 0 = unbounded
    pub array_max_entries: usize,
    /// Namespace prefixed to every id by the provider
    pub namespace: String,
    /// Default TTL in seconds for entries saved without one, 0 = never expire
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - auto, file, sqlite, array or none (default: auto)
    /// - `CACHE_DIR` - file store directory (default: `<tmp>/orm-cache`)
    /// - `CACHE_EXTENSION` - cache file extension (default: `.cache.data`)
    /// - `CACHE_UMASK` - octal umask (default: 0002)
    /// - `CACHE_SQLITE_PATH` - database file (default: `<CACHE_DIR>/cache.db`)
    /// - `CACHE_SQLITE_TABLE` - table name (default: doctrine)
    /// - `CACHE_SQLITE_BUSY_TIMEOUT_MS` - lock wait (default: 30000)
    /// - `CACHE_SQLITE_WAL_RETRIES` - WAL switch attempts (default: 50)
    /// - `CACHE_SQLITE_WAL_FALLBACK` - fail or degrade (default: fail)
    /// - `CACHE_ARRAY_MAX_ENTRIES` - in-memory capacity (default: 0)
    /// - `CACHE_NAMESPACE` - provider namespace (default: empty)
    /// - `DEFAULT_TTL` - default TTL in seconds (default: 0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend = match env::var("CACHE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };
        let cache_dir = env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);
        let sqlite_path = env::var("CACHE_SQLITE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| cache_dir.join("cache.db"));
        let umask = match env::var("CACHE_UMASK") {
            Ok(value) => parse_umask(&value)?,
            Err(_) => defaults.umask,
        };
        let sqlite_wal_fallback = match env::var("CACHE_SQLITE_WAL_FALLBACK") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.sqlite_wal_fallback,
        };

        Ok(Self {
            backend,
            cache_dir,
            extension: env::var("CACHE_EXTENSION").unwrap_or(defaults.extension),
            umask,
            sqlite_path,
            sqlite_table: env::var("CACHE_SQLITE_TABLE").unwrap_or(defaults.sqlite_table),
            sqlite_busy_timeout_ms: parsed_var("CACHE_SQLITE_BUSY_TIMEOUT_MS")
                .unwrap_or(defaults.sqlite_busy_timeout_ms),
            sqlite_wal_retries: parsed_var("CACHE_SQLITE_WAL_RETRIES")
                .unwrap_or(defaults.sqlite_wal_retries),
            sqlite_wal_fallback,
            array_max_entries: parsed_var("CACHE_ARRAY_MAX_ENTRIES")
                .unwrap_or(defaults.array_max_entries),
            namespace: env::var("CACHE_NAMESPACE").unwrap_or(defaults.namespace),
            default_ttl: parsed_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: parsed_var("SERVER_PORT").unwrap_or(defaults.server_port),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = env::temp_dir().join("orm-cache");
        Self {
            backend: BackendKind::Auto,
            sqlite_path: cache_dir.join("cache.db"),
            cache_dir,
            extension: DEFAULT_EXTENSION.to_string(),
            umask: DEFAULT_UMASK,
            sqlite_table: "doctrine".to_string(),
            sqlite_busy_timeout_ms: 30_000,
            sqlite_wal_retries: 50,
            sqlite_wal_fallback: WalFallback::Fail,
            array_max_entries: 0,
            namespace: String::new(),
            default_ttl: 0,
            server_port: 3000,
        }
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Parses an octal umask such as `0022`, `022` or `0o022`.
fn parse_umask(value: &str) -> Result<u32> {
    let digits = value.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mask| *mask <= 0o777)
        .ok_or_else(|| CacheError::Configuration(format!("Invalid umask \"{value}\"")))
}
