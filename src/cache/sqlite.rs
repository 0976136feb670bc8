//! SQLite Cache Store Module
//!
//! All entries live in one table `(k TEXT PRIMARY KEY, d BLOB, e INTEGER NULL)`
//! of a WAL-mode database. Cross-process concurrency is left to SQLite's
//! locking; the busy timeout decides how long a call waits for a lock.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, error, info, warn};

use crate::cache::{expiration_for, is_expired, unix_now, CacheStats, CacheStore};
use crate::error::{CacheError, Result};

/// What to do once the WAL switch has exhausted its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalFallback {
    /// Refuse to open the store
    #[default]
    Fail,
    /// Log the failure and keep the default journal
    Degrade,
}

impl FromStr for WalFallback {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "degrade" => Ok(Self::Degrade),
            other => Err(CacheError::Configuration(format!(
                "Unknown WAL fallback \"{other}\", expected fail or degrade"
            ))),
        }
    }
}

/// Tuning for [`SqliteStore::open_with`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// Table holding the entries
    pub table: String,
    /// How long a statement waits on a lock before failing
    pub busy_timeout: Duration,
    /// Attempts at switching the journal to WAL
    pub wal_retries: u32,
    /// Pause between WAL attempts
    pub wal_retry_delay: Duration,
    pub wal_fallback: WalFallback,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            table: "doctrine".to_string(),
            busy_timeout: Duration::from_secs(30),
            wal_retries: 50,
            wal_retry_delay: Duration::from_millis(100),
            wal_fallback: WalFallback::Fail,
        }
    }
}

/// Outcome of the journal mode switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalState {
    Wal,
    /// SQLite answered with another mode (e.g. `memory` for in-memory databases)
    Other(String),
    /// Retries exhausted under the degrade policy
    Degraded,
}

/// SQL text for one table, built once at open.
#[derive(Debug)]
struct Queries {
    fetch: String,
    contains: String,
    save: String,
    delete: String,
    flush: String,
}

impl Queries {
    fn for_table(table: &str) -> Self {
        Self {
            fetch: format!("SELECT d, e FROM {table} WHERE k = ?1"),
            contains: format!("SELECT k, e FROM {table} WHERE k = ?1"),
            save: format!("INSERT OR REPLACE INTO {table} (k, d, e) VALUES (?1, ?2, ?3)"),
            delete: format!("DELETE FROM {table} WHERE k = ?1"),
            flush: format!("DELETE FROM {table}"),
        }
    }
}

// == SQLite Store ==
/// Cache store backed by a single SQLite database file.
///
/// Unlike the file store, query failures reach the caller as
/// `CacheError::Query`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
    journal: JournalState,
    queries: Queries,
}

impl SqliteStore {
    // == Constructor ==
    /// Opens or creates the database at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, SqliteOptions::default())
    }

    /// Opens or creates the database, switches it to WAL and ensures the table.
    ///
    /// # Errors
    /// - `Configuration` if the table name is invalid or the file cannot be opened
    /// - `TransientLock` if the WAL switch stayed locked and the policy is `Fail`
    /// - `Query` for any other SQLite failure during setup
    pub fn open_with(path: impl AsRef<Path>, options: SqliteOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        validate_table_name(&options.table)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                CacheError::Configuration(format!(
                    "Cannot create directory \"{}\": {err}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(&path).map_err(|err| {
            CacheError::Configuration(format!(
                "Cannot open database \"{}\": {err}",
                path.display()
            ))
        })?;
        conn.busy_timeout(options.busy_timeout)?;

        let journal = switch_to_wal(
            || {
                conn.pragma_update_and_check(None, "journal_mode", "wal", |row| {
                    row.get::<_, String>(0)
                })
            },
            &options,
        )?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (k TEXT PRIMARY KEY NOT NULL, d BLOB, e INTEGER NULL)",
            options.table
        ))?;

        info!(path = %path.display(), table = %options.table, journal = ?journal, "SQLite cache store ready");

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            journal,
            queries: Queries::for_table(&options.table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Journal mode the store ended up with.
    pub fn journal(&self) -> &JournalState {
        &self.journal
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Internal("SQLite connection lock poisoned".to_string()))
    }

    fn evict(&self, conn: &Connection, key: &str) -> Result<()> {
        debug!(key, "Evicting stale cache row");
        conn.prepare_cached(&self.queries.delete)?
            .execute(params![key])?;
        Ok(())
    }
}

impl CacheStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn()?;
        let row = conn
            .prepare_cached(&self.queries.fetch)?
            .query_row(params![key], |row| {
                Ok((row.get::<_, Option<Vec<u8>>>(0)?, row.get::<_, Option<i64>>(1)?))
            })
            .optional()?;

        match row {
            Some((_, expires_at)) if is_expired(expires_at, unix_now()) => {
                self.evict(&conn, key)?;
                Ok(None)
            }
            Some((payload, _)) => Ok(Some(payload.unwrap_or_default())),
            None => Ok(None),
        }
    }

    fn contains(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let expires_at = conn
            .prepare_cached(&self.queries.contains)?
            .query_row(params![key], |row| row.get::<_, Option<i64>>(1))
            .optional()?;

        match expires_at {
            Some(expires_at) if is_expired(expires_at, unix_now()) => {
                self.evict(&conn, key)?;
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    fn save(&self, key: &str, payload: &[u8], ttl_seconds: u64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .prepare_cached(&self.queries.save)?
            .execute(params![key, payload, expiration_for(ttl_seconds)])?;
        Ok(changed > 0)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        conn.prepare_cached(&self.queries.delete)?
            .execute(params![key])?;
        Ok(true)
    }

    fn flush(&self) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(&self.queries.flush, [])?;
        debug!(removed, "SQLite cache flushed");
        Ok(true)
    }

    fn stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Runs `attempt` until the journal switch goes through, retrying on lock
/// contention and disk I/O errors with a fixed pause.
fn switch_to_wal<F>(mut attempt: F, options: &SqliteOptions) -> Result<JournalState>
where
    F: FnMut() -> rusqlite::Result<String>,
{
    let budget = options.wal_retries.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match attempt() {
            Ok(mode) if mode.eq_ignore_ascii_case("wal") => return Ok(JournalState::Wal),
            Ok(mode) => {
                warn!(mode = %mode, "SQLite kept a non-WAL journal mode");
                return Ok(JournalState::Other(mode));
            }
            Err(err) if is_transient(&err) && attempts < budget => {
                warn!(attempts, error = %err, "Database locked while enabling WAL, retrying");
                thread::sleep(options.wal_retry_delay);
            }
            Err(err) if is_transient(&err) => {
                return match options.wal_fallback {
                    WalFallback::Fail => Err(CacheError::TransientLock {
                        attempts,
                        source: err,
                    }),
                    WalFallback::Degrade => {
                        error!(attempts, error = %err, "Giving up on WAL journal mode");
                        Ok(JournalState::Degraded)
                    }
                };
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::SystemIoFailure)
    )
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(CacheError::Configuration(format!(
            "Invalid SQLite table name \"{table}\""
        )))
    }
}
