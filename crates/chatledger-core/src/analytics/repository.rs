//! AnalyticsRepository trait definition.
//!
//! Read-only aggregate queries. Implementations must return zero-valued
//! results (not errors) when there is nothing to aggregate.

use chatledger_types::analytics::{PerformanceMetrics, SessionStats, StoreDailyStats};
use chatledger_types::error::StoreError;
use chrono::NaiveDate;
use uuid::Uuid;

pub trait AnalyticsRepository: Send + Sync {
    /// Message count, token total, mean latency and last activity of a session.
    fn session_stats(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<SessionStats, StoreError>> + Send;

    /// Aggregates over the sessions a store created on `date` (UTC).
    fn store_daily_stats(
        &self,
        store_id: &str,
        date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<StoreDailyStats, StoreError>> + Send;

    /// Latency percentiles, token usage and error rate over the trailing
    /// `days` days.
    fn performance_metrics(
        &self,
        store_id: &str,
        days: u32,
    ) -> impl std::future::Future<Output = Result<PerformanceMetrics, StoreError>> + Send;
}
