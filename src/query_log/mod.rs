//! Query Log Module
//!
//! Statement timing for the ORM connection: an event log capped per
//! connection, slow query reporting once per SQL hash, list parameter
//! expansion and a plain text SQL formatter.

mod event;
mod logger;
mod slow_query;
mod sql;

// Re-export public types
pub use event::QueryEvent;
pub use logger::{
    QueryLogger, ReportedQueries, DEFAULT_MAX_QUERY_TIME, DEFAULT_REPORTED_CAPACITY, MAX_EVENTS,
    MAX_QUERY_TIME_LIMIT_MS,
};
pub use slow_query::{SlowQuery, SlowQuerySink, SqliteSlowQueryLog, SLOW_QUERY_TABLE};
pub use sql::{
    expand_list_parameters, sql_hash, ExpandedQuery, SqlFormatter, SqlParams, FORMAT_WIDTH,
    SQL_HASH_LEN,
};
