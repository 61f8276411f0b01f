//! TraceSink trait definition.
//!
//! The external observability service. Optional: the forwarder runs without
//! one and every call becomes a no-op.

use chatledger_types::error::ForwardingError;
use chatledger_types::trace::{TraceRun, UserFeedback};

pub trait TraceSink: Send + Sync {
    /// Project that runs are recorded under.
    fn project_name(&self) -> &str;

    /// Record one structured run.
    fn record_run(
        &self,
        run: &TraceRun,
    ) -> impl std::future::Future<Output = Result<(), ForwardingError>> + Send;

    /// Attach user feedback to an earlier run.
    fn record_feedback(
        &self,
        feedback: &UserFeedback,
    ) -> impl std::future::Future<Output = Result<(), ForwardingError>> + Send;

    /// Whether the named project exists. Doubles as the connectivity probe.
    fn project_exists(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<bool, ForwardingError>> + Send;
}
