//! HttpTraceSink -- concrete [`TraceSink`] for a LangSmith-style REST API.
//!
//! - `POST {endpoint}/runs` records a run under the configured project.
//! - `POST {endpoint}/feedback` attaches feedback to a run.
//! - `GET {endpoint}/sessions?name=...` lists projects by name.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when setting the `x-api-key` header.

use std::time::Duration;

use chatledger_core::trace::sink::TraceSink;
use chatledger_types::config::TraceConfig;
use chatledger_types::error::ForwardingError;
use chatledger_types::trace::{TraceRun, UserFeedback};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Trace calls are best-effort; never let one hang a background task.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpTraceSink {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    project: String,
}

impl HttpTraceSink {
    pub fn new(
        api_key: SecretString,
        endpoint: impl Into<String>,
        project: impl Into<String>,
    ) -> Result<Self, ForwardingError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ForwardingError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project: project.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ForwardingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ForwardingError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Build the sink from configuration.
///
/// Returns `None` (tracing off) when disabled or when no API key is set.
/// Never fails startup: a client that cannot be built is logged and dropped.
pub fn build_trace_sink(config: &TraceConfig) -> Option<HttpTraceSink> {
    if !config.enabled {
        info!("Trace forwarding disabled by configuration");
        return None;
    }
    let api_key = config.api_key.as_deref().filter(|k| !k.trim().is_empty())?;

    match HttpTraceSink::new(
        SecretString::from(api_key.to_string()),
        config.endpoint.clone(),
        config.project.clone(),
    ) {
        Ok(sink) => Some(sink),
        Err(e) => {
            warn!(error = %e, "Failed to create trace sink, tracing disabled");
            None
        }
    }
}

#[derive(Serialize)]
struct RunRequest<'a> {
    id: Uuid,
    name: &'a str,
    run_type: chatledger_types::trace::RunType,
    inputs: &'a serde_json::Value,
    outputs: &'a serde_json::Value,
    extra: RunExtra<'a>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    session_name: &'a str,
}

#[derive(Serialize)]
struct RunExtra<'a> {
    metadata: &'a serde_json::Value,
}

#[derive(Serialize)]
struct FeedbackRequest<'a> {
    run_id: &'a str,
    key: &'a str,
    score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

#[derive(Deserialize)]
struct ProjectSummary {
    name: String,
}

impl TraceSink for HttpTraceSink {
    fn project_name(&self) -> &str {
        &self.project
    }

    async fn record_run(&self, run: &TraceRun) -> Result<(), ForwardingError> {
        let body = RunRequest {
            id: run.id,
            name: &run.name,
            run_type: run.run_type,
            inputs: &run.inputs,
            outputs: &run.outputs,
            extra: RunExtra {
                metadata: &run.metadata,
            },
            start_time: run.start_time,
            end_time: run.end_time,
            error: run.error.as_deref(),
            session_name: &self.project,
        };

        let response = self
            .client
            .post(self.url("/runs"))
            .header("x-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ForwardingError::Request(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn record_feedback(&self, feedback: &UserFeedback) -> Result<(), ForwardingError> {
        let body = FeedbackRequest {
            run_id: &feedback.trace_id,
            key: &feedback.key,
            score: feedback.score,
            comment: feedback.comment.as_deref(),
        };

        let response = self
            .client
            .post(self.url("/feedback"))
            .header("x-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ForwardingError::Request(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn project_exists(&self, name: &str) -> Result<bool, ForwardingError> {
        let response = self
            .client
            .get(self.url("/sessions"))
            .header("x-api-key", self.api_key.expose_secret())
            .query(&[("name", name)])
            .send()
            .await
            .map_err(|e| ForwardingError::Request(e.to_string()))?;
        let projects: Vec<ProjectSummary> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ForwardingError::Serialization(e.to_string()))?;
        Ok(projects.iter().any(|p| p.name == name))
    }
}
