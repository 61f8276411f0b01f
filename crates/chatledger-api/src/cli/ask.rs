//! `chatledger ask`: generate a reply with the configured model and log it.

use anyhow::{Context, Result};
use console::style;
use uuid::Uuid;

use super::{parse_metadata, print_json};
use crate::state::AppState;

pub async fn ask(
    state: &AppState,
    session_id: Uuid,
    message: &str,
    metadata: Option<&str>,
    json: bool,
) -> Result<()> {
    let business_metadata = parse_metadata(metadata)?;
    let provider = state.model_provider()?;

    let reply = state
        .tracker
        .respond(&provider, session_id, message, business_metadata)
        .await
        .with_context(|| format!("Model call failed for session {session_id}"))?;

    if json {
        return print_json(&reply);
    }
    println!();
    println!("  {}", reply.content);
    println!();
    let tokens = reply
        .token_usage
        .as_ref()
        .and_then(|u| u.total_tokens)
        .map(|t| format!(", {t} tokens"))
        .unwrap_or_default();
    println!(
        "  {}",
        style(format!(
            "{} ms{} · {}",
            reply.response_time_ms,
            tokens,
            state.config.model.chat_model
        ))
        .dim()
    );
    println!();
    Ok(())
}
