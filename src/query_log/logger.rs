//! Query Logger Module
//!
//! Accumulates executed statements with their timings and reports each slow
//! statement once.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::LruTracker;
use crate::query_log::{QueryEvent, SlowQuery, SlowQuerySink};

/// Events kept per logger; later queries are not recorded.
pub const MAX_EVENTS: usize = 300;

/// Slow query threshold unless configured otherwise.
pub const DEFAULT_MAX_QUERY_TIME: Duration = Duration::from_millis(150);

/// Upper bound accepted by [`QueryLogger::set_max_query_time`], in ms.
pub const MAX_QUERY_TIME_LIMIT_MS: i64 = 30_000;

/// Hashes remembered as already reported.
pub const DEFAULT_REPORTED_CAPACITY: usize = 1024;

// == Reported Queries ==
/// Bounded set of query hashes already reported as slow.
///
/// The least recently seen hash is forgotten first, after which the sink
/// is asked again.
#[derive(Debug)]
pub struct ReportedQueries {
    seen: LruTracker,
    capacity: usize,
}

impl ReportedQueries {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: LruTracker::new(),
            capacity: capacity.max(1),
        }
    }

    /// Checks for `hash`, refreshing it when present.
    pub fn contains(&mut self, hash: &str) -> bool {
        if self.seen.contains(hash) {
            self.seen.touch(hash);
            return true;
        }
        false
    }

    pub fn insert(&mut self, hash: &str) {
        self.seen.touch(hash);
        while self.seen.len() > self.capacity {
            if self.seen.evict_oldest().is_none() {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// == Query Logger ==
/// Per-connection statement log with a slow query threshold.
pub struct QueryLogger {
    events: Vec<QueryEvent>,
    /// True while the last started query is recorded and not yet stopped
    pending: bool,
    max_query_time: Duration,
    started_at: Instant,
    reported: ReportedQueries,
    sink: Option<Box<dyn SlowQuerySink>>,
}

impl std::fmt::Debug for QueryLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryLogger")
            .field("events", &self.events.len())
            .field("max_query_time", &self.max_query_time)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for QueryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryLogger {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            pending: false,
            max_query_time: DEFAULT_MAX_QUERY_TIME,
            started_at: Instant::now(),
            reported: ReportedQueries::new(DEFAULT_REPORTED_CAPACITY),
            sink: None,
        }
    }

    /// Persists slow queries through `sink`.
    pub fn with_sink(mut self, sink: impl SlowQuerySink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn with_reported_capacity(mut self, capacity: usize) -> Self {
        self.reported = ReportedQueries::new(capacity);
        self
    }

    /// Sets the slow query threshold, clamped to 0..=30000 ms.
    pub fn set_max_query_time(&mut self, millis: i64) {
        let clamped = millis.clamp(0, MAX_QUERY_TIME_LIMIT_MS);
        self.max_query_time = Duration::from_millis(clamped.unsigned_abs());
    }

    pub fn max_query_time(&self) -> Duration {
        self.max_query_time
    }

    // == Start / Stop ==
    /// Records the start of a statement. Returns false once the log is full.
    pub fn start_query(&mut self, sql: impl Into<String>, params: Vec<Value>) -> bool {
        if self.events.len() >= MAX_EVENTS {
            self.pending = false;
            return false;
        }

        let delay = self.started_at.elapsed();
        self.events.push(QueryEvent::start(sql, params, delay));
        self.pending = true;
        true
    }

    /// Ends the statement started last and reports it if it was slow.
    ///
    /// Returns None when that statement was not recorded.
    pub fn stop_query(&mut self) -> Option<&QueryEvent> {
        if !std::mem::take(&mut self.pending) {
            return None;
        }

        let event = self.events.last_mut()?;
        event.end();

        let slow = event
            .duration()
            .is_some_and(|duration| duration > self.max_query_time);
        if slow {
            let report = SlowQuery::from_event(event);
            self.report(report);
        }

        self.events.last()
    }

    fn report(&mut self, query: SlowQuery) {
        if self.reported.contains(&query.hash) {
            return;
        }

        warn!(
            hash = %query.hash,
            duration_ms = query.duration_ms,
            "Slow query: {}",
            query.query
        );

        if let Some(sink) = &self.sink {
            let stored = sink.exists(&query.hash).and_then(|exists| {
                if exists {
                    Ok(())
                } else {
                    sink.record(&query)
                }
            });
            if let Err(err) = stored {
                debug!(hash = %query.hash, error = %err, "Slow query not stored");
                return;
            }
        }

        self.reported.insert(&query.hash);
    }

    // == Accessors ==
    pub fn events(&self) -> &[QueryEvent] {
        &self.events
    }

    /// Number of recorded statements.
    pub fn counter(&self) -> usize {
        self.events.len()
    }

    /// Total time spent in finished statements.
    pub fn total_time(&self) -> Duration {
        self.events.iter().filter_map(QueryEvent::duration).sum()
    }

    /// One-line summary, e.g. `12 queries / 3.4 ms`.
    pub fn summary(&self) -> String {
        let total = self.total_time();
        if total.is_zero() {
            format!("{} queries", self.counter())
        } else {
            format!(
                "{} queries / {:.1} ms",
                self.counter(),
                total.as_secs_f64() * 1_000.0
            )
        }
    }
}
