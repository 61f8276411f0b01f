//! Application state wiring the tracker to its infra implementations.
//!
//! `ChatTracker` is generic over repository and sink traits; AppState pins
//! it to SQLite storage and the HTTP trace sink.

use std::sync::Arc;

use anyhow::{Context, Result};
use chatledger_core::trace::forwarder::TraceForwarder;
use chatledger_core::tracker::service::ChatTracker;
use chatledger_infra::llm::openai_compat::OpenAiCompatProvider;
use chatledger_infra::sqlite::analytics::SqliteAnalyticsRepository;
use chatledger_infra::sqlite::pool::DatabasePool;
use chatledger_infra::sqlite::session::{RetentionPolicy, SqliteSessionRepository};
use chatledger_infra::trace::http_sink::{HttpTraceSink, build_trace_sink};
use chatledger_types::config::AppConfig;
use secrecy::SecretString;

/// Concrete type alias for the tracker generics pinned to infra implementations.
pub type ConcreteChatTracker =
    ChatTracker<SqliteSessionRepository, SqliteAnalyticsRepository, HttpTraceSink>;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<ConcreteChatTracker>,
    pub config: AppConfig,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Connect to the database (running migrations) and wire the tracker.
    pub async fn init(config: AppConfig) -> Result<Self> {
        let db_pool = DatabasePool::new(&config.database)
            .await
            .with_context(|| format!("Failed to open database '{}'", config.database.url))?;

        let sessions = SqliteSessionRepository::new(
            db_pool.clone(),
            RetentionPolicy::from(&config.retention),
        );
        let analytics = SqliteAnalyticsRepository::new(db_pool.clone());
        let forwarder = TraceForwarder::from_optional(build_trace_sink(&config.trace));

        Ok(Self {
            tracker: Arc::new(ChatTracker::new(sessions, analytics, forwarder)),
            config,
            db_pool,
        })
    }

    /// Build the model provider from configuration. Requires an API key.
    pub fn model_provider(&self) -> Result<OpenAiCompatProvider> {
        let api_key = self
            .config
            .model
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("No model API key configured (set CHATLEDGER_MODEL_API_KEY)")?;

        OpenAiCompatProvider::new(SecretString::from(api_key.to_string()), &self.config.model)
            .context("Failed to create model provider")
    }

    /// Drain background trace forwards and close the pool.
    pub async fn shutdown(&self) {
        self.tracker.shutdown().await;
        self.db_pool.close().await;
    }
}
