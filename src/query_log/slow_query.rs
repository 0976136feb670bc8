//! Slow Query Module
//!
//! Records of statements that ran past the logger's threshold, and the
//! sinks that keep them.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;

use crate::cache::unix_now;
use crate::error::{CacheError, Result};
use crate::query_log::QueryEvent;

/// Table holding reported slow queries.
pub const SLOW_QUERY_TABLE: &str = "core__database_slow_query";

// == Slow Query ==
/// One slow statement, stored once per hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowQuery {
    pub query: String,
    pub hash: String,
    pub duration_ms: f64,
    /// Unix seconds
    pub inserted_at: i64,
}

impl SlowQuery {
    pub fn from_event(event: &QueryEvent) -> Self {
        Self {
            query: event.sql().trim().to_string(),
            hash: event.hash().to_string(),
            duration_ms: event.duration_ms().unwrap_or(0.0),
            inserted_at: unix_now(),
        }
    }
}

// == Sink Trait ==
/// Somewhere slow queries are kept.
pub trait SlowQuerySink: Send {
    /// True when a query with this hash was already recorded.
    fn exists(&self, hash: &str) -> Result<bool>;

    fn record(&self, query: &SlowQuery) -> Result<()>;
}

// == SQLite Sink ==
/// Slow query log kept in a SQLite table, one row per hash.
#[derive(Debug)]
pub struct SqliteSlowQueryLog {
    conn: Mutex<Connection>,
}

impl SqliteSlowQueryLog {
    /// Opens or creates the log at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|err| {
            CacheError::Configuration(format!(
                "Cannot open slow query log \"{}\": {err}",
                path.display()
            ))
        })?;
        let log = Self::with_connection(conn)?;
        info!(path = %path.display(), "Slow query log ready");
        Ok(log)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {SLOW_QUERY_TABLE} (
                hash TEXT PRIMARY KEY NOT NULL,
                query TEXT NOT NULL,
                duration REAL NOT NULL,
                inserted_date INTEGER NOT NULL
            )"
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Most recently inserted entries first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SlowQuery>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT query, hash, duration, inserted_date FROM {SLOW_QUERY_TABLE}
             ORDER BY inserted_date DESC, rowid DESC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok(SlowQuery {
                query: row.get(0)?,
                hash: row.get(1)?,
                duration_ms: row.get(2)?,
                inserted_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Internal("slow query log lock poisoned".to_string()))
    }
}

impl SlowQuerySink for SqliteSlowQueryLog {
    fn exists(&self, hash: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .prepare_cached(&format!(
                "SELECT 1 FROM {SLOW_QUERY_TABLE} WHERE hash = ?1 LIMIT 1"
            ))?
            .query_row(params![hash], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn record(&self, query: &SlowQuery) -> Result<()> {
        let conn = self.conn()?;
        conn.prepare_cached(&format!(
            "INSERT OR IGNORE INTO {SLOW_QUERY_TABLE} (hash, query, duration, inserted_date)
             VALUES (?1, ?2, ?3, ?4)"
        ))?
        .execute(params![
            query.hash,
            query.query,
            query.duration_ms,
            query.inserted_at
        ])?;
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn slow(sql: &str, duration_ms: f64) -> SlowQuery {
        SlowQuery {
            query: sql.to_string(),
            hash: crate::query_log::sql_hash(sql),
            duration_ms,
            inserted_at: unix_now(),
        }
    }

    #[test]
    fn test_record_and_exists() {
        let log = SqliteSlowQueryLog::open_in_memory().unwrap();
        let query = slow("SELECT * FROM big", 420.0);

        assert!(!log.exists(&query.hash).unwrap());
        log.record(&query).unwrap();
        assert!(log.exists(&query.hash).unwrap());

        let recent = log.recent(10).unwrap();
        assert_eq!(recent, vec![query]);
    }

    #[test]
    fn test_same_hash_recorded_once() {
        let log = SqliteSlowQueryLog::open_in_memory().unwrap();
        log.record(&slow("SELECT 1", 200.0)).unwrap();
        log.record(&slow("SELECT  1", 900.0)).unwrap();

        let recent = log.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].duration_ms, 200.0);
    }
}
