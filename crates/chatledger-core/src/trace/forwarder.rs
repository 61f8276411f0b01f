//! Best-effort trace forwarder.
//!
//! Every public `track_*` method catches forwarding failures, logs them at
//! `warn` and returns normally. Nothing in here can fail the durable path.
//! A forwarder without a sink (missing credentials, tracing disabled) is a
//! silent no-op.

use std::fmt::Display;
use std::future::Future;

use chatledger_types::chat::{Metadata, TokenUsage};
use chatledger_types::error::ForwardingError;
use chatledger_types::trace::{BatchOutcome, InteractionTrace, RunType, TraceRun, UserFeedback};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::sink::TraceSink;

/// Run name used for logged chat interactions.
pub const INTERACTION_RUN_NAME: &str = "chat_interaction";

pub struct TraceForwarder<S: TraceSink> {
    sink: Option<S>,
}

impl<S: TraceSink> TraceForwarder<S> {
    pub fn new(sink: S) -> Self {
        Self { sink: Some(sink) }
    }

    /// A forwarder that drops everything.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Build from an optional sink, logging once when tracing is off.
    pub fn from_optional(sink: Option<S>) -> Self {
        match sink {
            Some(sink) => Self::new(sink),
            None => {
                info!("Trace sink not configured, interaction tracing disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Forward one interaction. Failures are logged, never returned.
    pub async fn track_interaction(&self, trace: &InteractionTrace) {
        match self.forward_interaction(trace).await {
            Ok(()) => debug!(session_id = %trace.session_id, "Interaction forwarded to trace sink"),
            Err(ForwardingError::Disabled) => {}
            Err(e) => warn!(
                session_id = %trace.session_id,
                error = %e,
                "Failed to forward interaction to trace sink"
            ),
        }
    }

    /// Attach user feedback to a traced run. Failures are logged, never returned.
    pub async fn track_feedback(&self, feedback: &UserFeedback) {
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.record_feedback(feedback).await {
            Ok(()) => debug!(trace_id = %feedback.trace_id, key = %feedback.key, "Feedback forwarded"),
            Err(e) => warn!(
                trace_id = %feedback.trace_id,
                error = %e,
                "Failed to forward feedback to trace sink"
            ),
        }
    }

    /// Forward a batch concurrently. Items settle independently; one failure
    /// never cancels the rest.
    pub async fn track_batch(&self, traces: &[InteractionTrace]) -> BatchOutcome {
        let results = join_all(traces.iter().map(|t| self.forward_interaction(t))).await;

        let mut outcome = BatchOutcome {
            attempted: traces.len(),
            ..Default::default()
        };
        for (trace, result) in traces.iter().zip(results) {
            match result {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.failed += 1;
                    if !matches!(e, ForwardingError::Disabled) {
                        warn!(session_id = %trace.session_id, error = %e, "Batch item failed to forward");
                    }
                }
            }
        }
        debug!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Trace batch settled"
        );
        outcome
    }

    /// Record a prepared run. Failures are logged, never returned.
    pub async fn track_run(&self, run: &TraceRun) {
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.record_run(run).await {
            Ok(()) => debug!(run = %run.name, run_id = %run.id, "Run forwarded to trace sink"),
            Err(e) => warn!(run = %run.name, error = %e, "Failed to record traced run"),
        }
    }

    /// Run `op` and record it as a run named `name`.
    ///
    /// The run carries either the serialized output or the error text. The
    /// record is awaited after `op` completes; callers on a latency-sensitive
    /// path build the run with [`op_run`] and hand it to a background task
    /// instead. Forwarding failures are swallowed; `op`'s own result is
    /// returned untouched.
    pub async fn traced<T, E, F, Fut>(
        &self,
        name: &str,
        inputs: serde_json::Value,
        op: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let start_time = Utc::now();
        let result = op().await;
        if self.is_enabled() {
            self.track_run(&op_run(name, inputs, start_time, &result)).await;
        }
        result
    }

    /// Probe the sink by checking that the configured project exists.
    ///
    /// Any error, a missing project or an absent sink reports `false`.
    pub async fn check_connectivity(&self) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        match sink.project_exists(sink.project_name()).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(error = %e, "Trace sink connectivity probe failed");
                false
            }
        }
    }

    async fn forward_interaction(&self, trace: &InteractionTrace) -> Result<(), ForwardingError> {
        let sink = self.sink.as_ref().ok_or(ForwardingError::Disabled)?;
        sink.record_run(&interaction_run(trace)?).await
    }
}

/// Shape the outcome of a traced operation as an LLM run ending now.
pub fn op_run<T: Serialize, E: Display>(
    name: &str,
    inputs: serde_json::Value,
    start_time: DateTime<Utc>,
    result: &Result<T, E>,
) -> TraceRun {
    let (outputs, error) = match result {
        Ok(value) => (
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
            None,
        ),
        Err(e) => (serde_json::Value::Null, Some(e.to_string())),
    };
    TraceRun {
        id: Uuid::now_v7(),
        name: name.to_string(),
        run_type: RunType::Llm,
        inputs,
        outputs,
        metadata: json!({}),
        start_time,
        end_time: Utc::now(),
        error,
    }
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    session_id: Uuid,
    token_usage: Option<&'a TokenUsage>,
    response_time_ms: Option<u64>,
    trace_id: Option<&'a str>,
    business_metadata: Option<&'a Metadata>,
}

/// Shape an interaction as a chain run.
///
/// An externally supplied `trace_id` that is a UUID becomes the run id so
/// feedback can later be attached to it.
fn interaction_run(trace: &InteractionTrace) -> Result<TraceRun, ForwardingError> {
    let id = trace
        .trace_id
        .as_deref()
        .and_then(|t| Uuid::parse_str(t).ok())
        .unwrap_or_else(Uuid::now_v7);

    let metadata = RunMetadata {
        session_id: trace.session_id,
        token_usage: trace.token_usage.as_ref(),
        response_time_ms: trace.response_time_ms,
        trace_id: trace.trace_id.as_deref(),
        business_metadata: trace.business_metadata.as_ref(),
    };

    let end_time = trace.timestamp;
    let start_time = trace
        .response_time_ms
        .and_then(|ms| i64::try_from(ms).ok())
        .map(|ms| end_time - chrono::TimeDelta::milliseconds(ms))
        .unwrap_or(end_time);

    Ok(TraceRun {
        id,
        name: INTERACTION_RUN_NAME.to_string(),
        run_type: RunType::Chain,
        inputs: json!({ "user_message": trace.user_message }),
        outputs: json!({ "assistant_response": trace.assistant_response }),
        metadata: serde_json::to_value(metadata)
            .map_err(|e| ForwardingError::Serialization(e.to_string()))?,
        start_time,
        end_time,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records runs; fails every call whose user message contains "fail".
    #[derive(Default)]
    struct FakeSink {
        runs: Mutex<Vec<TraceRun>>,
        feedback: Mutex<Vec<UserFeedback>>,
        probes: AtomicUsize,
        project_present: bool,
    }

    impl TraceSink for FakeSink {
        fn project_name(&self) -> &str {
            "rag-chatbot"
        }

        async fn record_run(&self, run: &TraceRun) -> Result<(), ForwardingError> {
            if run.inputs.to_string().contains("fail") {
                return Err(ForwardingError::Request("connection reset".to_string()));
            }
            self.runs.lock().unwrap().push(run.clone());
            Ok(())
        }

        async fn record_feedback(&self, feedback: &UserFeedback) -> Result<(), ForwardingError> {
            self.feedback.lock().unwrap().push(feedback.clone());
            Ok(())
        }

        async fn project_exists(&self, name: &str) -> Result<bool, ForwardingError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(self.project_present && name == "rag-chatbot")
        }
    }

    fn trace(user_message: &str) -> InteractionTrace {
        InteractionTrace {
            session_id: Uuid::now_v7(),
            user_message: user_message.to_string(),
            assistant_response: "hello".to_string(),
            token_usage: None,
            response_time_ms: Some(420),
            trace_id: None,
            business_metadata: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn track_interaction_records_chain_run() {
        let forwarder = TraceForwarder::new(FakeSink::default());
        forwarder.track_interaction(&trace("hi")).await;

        let runs = forwarder.sink.as_ref().unwrap().runs.lock().unwrap().clone();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, INTERACTION_RUN_NAME);
        assert_eq!(runs[0].run_type, RunType::Chain);
        assert_eq!(runs[0].inputs["user_message"], "hi");
        assert_eq!(runs[0].outputs["assistant_response"], "hello");
        assert_eq!(runs[0].metadata["response_time_ms"], 420);
        assert_eq!(
            (runs[0].end_time - runs[0].start_time).num_milliseconds(),
            420
        );
    }

    #[tokio::test]
    async fn track_interaction_swallows_sink_failure() {
        let forwarder = TraceForwarder::new(FakeSink::default());
        forwarder.track_interaction(&trace("please fail")).await;
        assert!(forwarder.sink.as_ref().unwrap().runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn uuid_trace_id_becomes_run_id() {
        let forwarder = TraceForwarder::new(FakeSink::default());
        let run_id = Uuid::now_v7();
        let mut t = trace("hi");
        t.trace_id = Some(run_id.to_string());
        forwarder.track_interaction(&t).await;

        let runs = forwarder.sink.as_ref().unwrap().runs.lock().unwrap().clone();
        assert_eq!(runs[0].id, run_id);
    }

    #[tokio::test]
    async fn batch_items_settle_independently() {
        let forwarder = TraceForwarder::new(FakeSink::default());
        let batch = vec![trace("a"), trace("fail here"), trace("b"), trace("fail again")];

        let outcome = forwarder.track_batch(&batch).await;
        assert_eq!(
            outcome,
            BatchOutcome {
                attempted: 4,
                succeeded: 2,
                failed: 2
            }
        );
        assert_eq!(forwarder.sink.as_ref().unwrap().runs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn disabled_forwarder_is_noop() {
        let forwarder: TraceForwarder<FakeSink> = TraceForwarder::disabled();
        assert!(!forwarder.is_enabled());
        forwarder.track_interaction(&trace("hi")).await;
        forwarder.track_feedback(&UserFeedback::new("run", 1.0)).await;
        assert!(!forwarder.check_connectivity().await);

        let outcome = forwarder.track_batch(&[trace("a")]).await;
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn traced_returns_op_result_and_records_error() {
        let forwarder = TraceForwarder::new(FakeSink::default());

        let ok: Result<u32, String> = forwarder
            .traced("lookup", json!({"q": "x"}), || async { Ok(7) })
            .await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u32, String> = forwarder
            .traced("lookup", json!({"q": "y"}), || async {
                Err("upstream timeout".to_string())
            })
            .await;
        assert_eq!(err.unwrap_err(), "upstream timeout");

        let runs = forwarder.sink.as_ref().unwrap().runs.lock().unwrap().clone();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].outputs, json!(7));
        assert!(runs[0].error.is_none());
        assert_eq!(runs[1].error.as_deref(), Some("upstream timeout"));
    }

    #[tokio::test]
    async fn traced_ignores_forwarding_failure() {
        let forwarder = TraceForwarder::new(FakeSink::default());
        let result: Result<&str, String> = forwarder
            .traced("op", json!({"note": "fail"}), || async { Ok("done") })
            .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn connectivity_reflects_project_probe() {
        let present = TraceForwarder::new(FakeSink {
            project_present: true,
            ..Default::default()
        });
        assert!(present.check_connectivity().await);

        let missing = TraceForwarder::new(FakeSink::default());
        assert!(!missing.check_connectivity().await);
        assert_eq!(missing.sink.as_ref().unwrap().probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn feedback_is_forwarded() {
        let forwarder = TraceForwarder::new(FakeSink::default());
        forwarder.track_feedback(&UserFeedback::new("run-1", 0.5)).await;
        let feedback = forwarder.sink.as_ref().unwrap().feedback.lock().unwrap().clone();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].trace_id, "run-1");
    }
}
