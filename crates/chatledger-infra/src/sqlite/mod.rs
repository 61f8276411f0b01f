//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod analytics;
pub mod pool;
pub mod session;

use chatledger_types::error::StoreError;
use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width RFC 3339 (microseconds, `Z`) so TEXT comparison in SQL
/// orders timestamps chronologically.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Persistence(format!("invalid datetime: {e}")))
}

pub(crate) fn sqlite_error(e: sqlx::Error) -> StoreError {
    StoreError::Persistence(e.to_string())
}
