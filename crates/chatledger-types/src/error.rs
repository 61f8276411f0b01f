use thiserror::Error;

/// Errors from the durable session/message store.
///
/// These always propagate to the caller; nothing on the durable path
/// swallows them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced session or message does not exist, or the session is
    /// not live where liveness is required.
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying storage operation failed (connectivity, constraint
    /// violation). The surrounding transaction has been rolled back.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Caller-supplied data violated a documented constraint.
    #[error("validation error: {0}")]
    Validation(String),
}

impl StoreError {
    pub fn session_not_found(id: impl std::fmt::Display) -> Self {
        StoreError::NotFound(format!("session '{id}'"))
    }
}

/// Errors from forwarding to the external trace sink.
///
/// Internal to the trace forwarder: always caught and logged there, never
/// surfaced past the chat tracker.
#[derive(Debug, Error)]
pub enum ForwardingError {
    #[error("trace sink disabled")]
    Disabled,

    #[error("trace request failed: {0}")]
    Request(String),

    #[error("trace sink returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("trace payload serialization failed: {0}")]
    Serialization(String),
}

/// Errors from the generative/embedding model provider. Never retried here.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited,

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("provider returned an empty response")]
    EmptyResponse,
}

/// Errors from chat tracker operations that call the model provider.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}
