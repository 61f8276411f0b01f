//! Configuration loader for chatledger.
//!
//! Reads `chatledger.toml` (or the path given on the command line) and
//! deserializes it into [`AppConfig`], then applies `CHATLEDGER_*`
//! environment overrides on top. A missing file means defaults; a file
//! that exists but cannot be read or parsed is an error.

use std::path::Path;
use std::str::FromStr;

use chatledger_types::config::AppConfig;
use chatledger_types::error::ConfigError;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "chatledger.toml";

/// Load configuration from `path`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but cannot be read, returns [`ConfigError::Read`].
/// - If the file exists but fails to parse, returns [`ConfigError::Parse`].
pub async fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    toml::from_str::<AppConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Load the file, then apply environment overrides from the process env.
pub async fn load_app_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut config = load_config(path).await?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Apply `CHATLEDGER_*` overrides using `lookup` as the variable source.
///
/// Empty values are ignored. A numeric or boolean value that does not parse
/// is a [`ConfigError::InvalidValue`].
pub fn apply_env_overrides(
    config: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let db = &mut config.database;
    if let Some(v) = get("CHATLEDGER_DATABASE_URL") {
        db.url = v;
    }
    override_parsed(&get, "CHATLEDGER_DB_MAX_CONNECTIONS", &mut db.max_connections)?;
    override_parsed(&get, "CHATLEDGER_DB_MIN_CONNECTIONS", &mut db.min_connections)?;
    override_parsed(
        &get,
        "CHATLEDGER_DB_ACQUIRE_TIMEOUT_SECS",
        &mut db.acquire_timeout_secs,
    )?;
    override_parsed(&get, "CHATLEDGER_DB_IDLE_TIMEOUT_SECS", &mut db.idle_timeout_secs)?;
    override_parsed(&get, "CHATLEDGER_DB_BUSY_TIMEOUT_SECS", &mut db.busy_timeout_secs)?;

    let trace = &mut config.trace;
    if let Some(v) = get("CHATLEDGER_TRACE_ENABLED") {
        trace.enabled = parse_bool("CHATLEDGER_TRACE_ENABLED", &v)?;
    }
    if let Some(v) = get("CHATLEDGER_TRACE_API_KEY") {
        trace.api_key = Some(v);
    }
    if let Some(v) = get("CHATLEDGER_TRACE_ENDPOINT") {
        trace.endpoint = v;
    }
    if let Some(v) = get("CHATLEDGER_TRACE_PROJECT") {
        trace.project = v;
    }

    let retention = &mut config.retention;
    override_parsed(
        &get,
        "CHATLEDGER_SESSION_TTL_HOURS",
        &mut retention.session_ttl_hours,
    )?;
    override_parsed(
        &get,
        "CHATLEDGER_HARD_DELETE_AFTER_DAYS",
        &mut retention.hard_delete_after_days,
    )?;

    let model = &mut config.model;
    if let Some(v) = get("CHATLEDGER_MODEL_BASE_URL") {
        model.base_url = v;
    }
    if let Some(v) = get("CHATLEDGER_MODEL_API_KEY") {
        model.api_key = Some(v);
    }
    if let Some(v) = get("CHATLEDGER_MODEL_CHAT") {
        model.chat_model = v;
    }
    if let Some(v) = get("CHATLEDGER_MODEL_EMBEDDING") {
        model.embedding_model = v;
    }
    override_parsed(&get, "CHATLEDGER_MODEL_TIMEOUT_SECS", &mut model.timeout_secs)?;

    Ok(())
}

fn override_parsed<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = get(key) {
        *target = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
