//! SQLite analytics repository implementation.
//!
//! Read-only aggregate queries over sessions and messages, all on the reader
//! pool. Soft-deleted sessions and messages are excluded everywhere. Empty
//! aggregates come back as zeros via `COALESCE`, never as errors.

use chatledger_core::analytics::percentile::latency_percentiles;
use chatledger_core::analytics::repository::AnalyticsRepository;
use chatledger_types::analytics::{
    CategoryCount, PerformanceMetrics, SessionStats, StoreDailyStats, TOP_CATEGORY_LIMIT,
    TokenUsageStats,
};
use chatledger_types::error::StoreError;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, sqlite_error};

/// SQLite-backed implementation of `AnalyticsRepository`.
pub struct SqliteAnalyticsRepository {
    pool: DatabasePool,
}

impl SqliteAnalyticsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// `[date 00:00Z, date+1 00:00Z)` as formatted bounds.
fn utc_day_bounds(date: NaiveDate) -> (String, String) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_signed(TimeDelta::days(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (format_datetime(&start), format_datetime(&end))
}

fn error_rate(errors: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        errors as f64 / total as f64 * 100.0
    }
}

impl AnalyticsRepository for SqliteAnalyticsRepository {
    async fn session_stats(&self, session_id: &Uuid) -> Result<SessionStats, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(m.id) AS message_count,
                    COALESCE(SUM(m.token_count), 0) AS total_tokens,
                    COALESCE(AVG(m.response_time_ms), 0.0) AS avg_response_time,
                    MAX(m.created_at) AS last_message_at
             FROM messages m
             JOIN sessions s ON s.id = m.session_id
             WHERE m.session_id = ? AND m.is_deleted = 0 AND s.deleted_at IS NULL",
        )
        .bind(session_id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(sqlite_error)?;

        let message_count: i64 = row.try_get("message_count").map_err(sqlite_error)?;
        let total_tokens: i64 = row.try_get("total_tokens").map_err(sqlite_error)?;
        let avg_response_time: f64 = row.try_get("avg_response_time").map_err(sqlite_error)?;
        let last_message_at: Option<String> =
            row.try_get("last_message_at").map_err(sqlite_error)?;

        Ok(SessionStats {
            session_id: *session_id,
            message_count: message_count as u64,
            total_tokens: total_tokens as u64,
            avg_response_time,
            last_active_at: match last_message_at {
                Some(ts) => parse_datetime(&ts)?,
                None => Utc::now(),
            },
        })
    }

    async fn store_daily_stats(
        &self,
        store_id: &str,
        date: NaiveDate,
    ) -> Result<StoreDailyStats, StoreError> {
        let (day_start, day_end) = utc_day_bounds(date);

        let row = sqlx::query(
            "SELECT COUNT(DISTINCT s.id) AS session_count,
                    COUNT(m.id) AS message_count,
                    COALESCE(SUM(m.token_count), 0) AS total_tokens,
                    COALESCE(AVG(m.response_time_ms), 0.0) AS avg_response_time
             FROM sessions s
             LEFT JOIN messages m ON m.session_id = s.id AND m.is_deleted = 0
             WHERE s.store_id = ? AND s.deleted_at IS NULL
               AND s.created_at >= ? AND s.created_at < ?",
        )
        .bind(store_id)
        .bind(&day_start)
        .bind(&day_end)
        .fetch_one(&self.pool.reader)
        .await
        .map_err(sqlite_error)?;

        let session_count: i64 = row.try_get("session_count").map_err(sqlite_error)?;
        let message_count: i64 = row.try_get("message_count").map_err(sqlite_error)?;
        let total_tokens: i64 = row.try_get("total_tokens").map_err(sqlite_error)?;
        let avg_response_time: f64 = row.try_get("avg_response_time").map_err(sqlite_error)?;

        let category_rows = sqlx::query(
            "SELECT CAST(json_extract(m.metadata, '$.category') AS TEXT) AS category,
                    COUNT(*) AS cnt
             FROM messages m
             JOIN sessions s ON s.id = m.session_id
             WHERE s.store_id = ? AND s.deleted_at IS NULL
               AND s.created_at >= ? AND s.created_at < ?
               AND m.is_deleted = 0
               AND json_extract(m.metadata, '$.category') IS NOT NULL
             GROUP BY category
             ORDER BY cnt DESC, category ASC
             LIMIT ?",
        )
        .bind(store_id)
        .bind(&day_start)
        .bind(&day_end)
        .bind(TOP_CATEGORY_LIMIT as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(sqlite_error)?;

        let top_categories = category_rows
            .iter()
            .map(|r| {
                Ok(CategoryCount {
                    category: r.try_get("category")?,
                    count: r.try_get::<i64, _>("cnt")? as u64,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(sqlite_error)?;

        Ok(StoreDailyStats {
            store_id: store_id.to_string(),
            date,
            session_count: session_count as u64,
            message_count: message_count as u64,
            total_tokens: total_tokens as u64,
            avg_response_time,
            top_categories,
        })
    }

    async fn performance_metrics(
        &self,
        store_id: &str,
        days: u32,
    ) -> Result<PerformanceMetrics, StoreError> {
        let window_start = Utc::now()
            .checked_sub_signed(TimeDelta::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let window_start = format_datetime(&window_start);

        let row = sqlx::query(
            "SELECT COUNT(m.id) AS total_messages,
                    COALESCE(AVG(m.response_time_ms), 0.0) AS avg_response_time,
                    COALESCE(AVG(m.token_count), 0.0) AS avg_tokens,
                    COALESCE(SUM(m.token_count), 0) AS total_tokens,
                    COALESCE(SUM(CASE
                        WHEN json_type(m.metadata, '$.error') IS NOT NULL
                         AND json_type(m.metadata, '$.error') NOT IN ('false', 'null')
                        THEN 1 ELSE 0 END), 0) AS error_count
             FROM messages m
             JOIN sessions s ON s.id = m.session_id
             WHERE s.store_id = ? AND s.deleted_at IS NULL
               AND m.is_deleted = 0 AND m.created_at >= ?",
        )
        .bind(store_id)
        .bind(&window_start)
        .fetch_one(&self.pool.reader)
        .await
        .map_err(sqlite_error)?;

        let total_messages: i64 = row.try_get("total_messages").map_err(sqlite_error)?;
        let avg_response_time: f64 = row.try_get("avg_response_time").map_err(sqlite_error)?;
        let avg_tokens: f64 = row.try_get("avg_tokens").map_err(sqlite_error)?;
        let total_tokens: i64 = row.try_get("total_tokens").map_err(sqlite_error)?;
        let error_count: i64 = row.try_get("error_count").map_err(sqlite_error)?;

        let latencies: Vec<i64> = sqlx::query_scalar(
            "SELECT m.response_time_ms
             FROM messages m
             JOIN sessions s ON s.id = m.session_id
             WHERE s.store_id = ? AND s.deleted_at IS NULL
               AND m.is_deleted = 0 AND m.created_at >= ?
               AND m.response_time_ms IS NOT NULL
             ORDER BY m.response_time_ms ASC",
        )
        .bind(store_id)
        .bind(&window_start)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(sqlite_error)?;
        let latencies: Vec<f64> = latencies.into_iter().map(|ms| ms as f64).collect();

        Ok(PerformanceMetrics {
            store_id: store_id.to_string(),
            window_days: days,
            avg_response_time,
            percentiles: latency_percentiles(&latencies),
            token_usage_stats: TokenUsageStats {
                avg: avg_tokens,
                total: total_tokens as u64,
            },
            error_rate: error_rate(error_count, total_messages),
        })
    }
}
