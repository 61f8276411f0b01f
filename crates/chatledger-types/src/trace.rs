//! Payloads forwarded to the external trace sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{Metadata, TokenUsage};

/// Everything recorded about one logged chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionTrace {
    pub session_id: Uuid,
    pub user_message: String,
    pub assistant_response: String,
    pub token_usage: Option<TokenUsage>,
    pub response_time_ms: Option<u64>,
    pub trace_id: Option<String>,
    pub business_metadata: Option<Metadata>,
    pub timestamp: DateTime<Utc>,
}

/// User rating attached to an earlier traced run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFeedback {
    /// Run identifier in the trace sink (the message's `trace_id`).
    pub trace_id: String,
    /// Feedback key, e.g. `user_rating`.
    pub key: String,
    pub score: f64,
    pub comment: Option<String>,
}

impl UserFeedback {
    pub const DEFAULT_KEY: &'static str = "user_rating";

    pub fn new(trace_id: impl Into<String>, score: f64) -> Self {
        Self {
            trace_id: trace_id.into(),
            key: Self::DEFAULT_KEY.to_string(),
            score,
            comment: None,
        }
    }
}

/// Kind of run recorded in the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Chain,
    Llm,
}

/// One structured run as the sink records it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRun {
    pub id: Uuid,
    pub name: String,
    pub run_type: RunType,
    pub inputs: serde_json::Value,
    pub outputs: serde_json::Value,
    pub metadata: serde_json::Value,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub error: Option<String>,
}

/// Result of forwarding a batch of interactions.
///
/// Items settle independently: a failed item never cancels the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}
