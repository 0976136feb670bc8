//! Query Event Module
//!
//! One executed statement as seen by the query logger.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::query_log::sql_hash;

// == Query Event ==
/// A statement with its parameters and timing.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    sql: String,
    hash: String,
    params: Vec<Value>,
    /// Time between the logger starting and this query starting
    delay: Duration,
    started: Instant,
    duration: Option<Duration>,
}

impl QueryEvent {
    pub(crate) fn start(sql: impl Into<String>, params: Vec<Value>, delay: Duration) -> Self {
        let sql = sql.into();
        Self {
            hash: sql_hash(&sql),
            sql,
            params,
            delay,
            started: Instant::now(),
            duration: None,
        }
    }

    /// Stops the clock. Later calls keep the first duration.
    pub fn end(&mut self) {
        if self.duration.is_none() {
            self.duration = Some(self.started.elapsed());
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// None until [`QueryEvent::end`] has been called.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn duration_ms(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64() * 1_000.0)
    }
}
