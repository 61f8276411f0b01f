//! Configuration types for chatledger.
//!
//! `AppConfig` represents `chatledger.toml`. Every field has a default, so an
//! empty or missing file is a valid configuration. Environment overrides are
//! applied on top by the loader in `chatledger-infra`.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// Relational store connection and pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Ceiling for the read pool; callers beyond it wait up to
    /// `acquire_timeout_secs`.
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// How long a writer waits on a locked database file.
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chatledger.db?mode=rwc".to_string(),
            max_connections: 8,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            busy_timeout_secs: 5,
        }
    }
}

/// External trace sink settings.
///
/// A missing `api_key` or `enabled = false` turns forwarding into a no-op.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub project: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            endpoint: "https://api.smith.langchain.com".to_string(),
            project: "rag-chatbot".to_string(),
        }
    }
}

impl std::fmt::Debug for TraceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("project", &self.project)
            .finish()
    }
}

/// Session expiry and purge windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Hours from creation until a session expires. `0` disables expiry.
    pub session_ttl_hours: u64,
    /// Days after soft deletion before a session is physically removed.
    pub hard_delete_after_days: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 720,
            hard_delete_after_days: 90,
        }
    }
}

/// Model provider settings (OpenAI-compatible REST API).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 120,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
