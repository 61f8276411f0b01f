//! Aggregate statistics returned by the analytics repository.
//!
//! Every aggregate defaults to zero (and lists to empty) when there is no
//! data to aggregate; "no rows yet" is never an error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-session message statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: Uuid,
    pub message_count: u64,
    pub total_tokens: u64,
    /// Mean assistant latency in milliseconds.
    pub avg_response_time: f64,
    pub last_active_at: DateTime<Utc>,
}

impl SessionStats {
    /// Zero-valued stats for a session without messages.
    pub fn empty(session_id: Uuid) -> Self {
        Self {
            session_id,
            message_count: 0,
            total_tokens: 0,
            avg_response_time: 0.0,
            last_active_at: Utc::now(),
        }
    }
}

/// Frequency of one business category within a reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Maximum number of entries in [`StoreDailyStats::top_categories`].
pub const TOP_CATEGORY_LIMIT: usize = 10;

/// Aggregates over the sessions a store created on one UTC calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDailyStats {
    pub store_id: String,
    pub date: NaiveDate,
    pub session_count: u64,
    pub message_count: u64,
    pub total_tokens: u64,
    pub avg_response_time: f64,
    /// Ordered by descending frequency, at most [`TOP_CATEGORY_LIMIT`] entries.
    pub top_categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsageStats {
    pub avg: f64,
    pub total: u64,
}

/// Store-level performance over a trailing window of days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub store_id: String,
    pub window_days: u32,
    pub avg_response_time: f64,
    pub percentiles: LatencyPercentiles,
    pub token_usage_stats: TokenUsageStats,
    /// Percentage (0-100) of messages carrying an error marker.
    pub error_rate: f64,
}
