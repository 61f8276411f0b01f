//! `chatledger log`: record one user/assistant exchange.

use anyhow::Result;
use chatledger_types::chat::{ChatInteraction, TokenUsage};
use console::style;

use super::{LogArgs, parse_metadata, print_json};
use crate::state::AppState;

pub async fn log_interaction(state: &AppState, args: LogArgs, json: bool) -> Result<()> {
    let business_metadata = parse_metadata(args.metadata.as_deref())?;
    let token_usage = usage_from(args.prompt_tokens, args.completion_tokens);

    let mut interaction =
        ChatInteraction::new(args.session, args.user_message, args.assistant_response);
    interaction.token_usage = token_usage;
    interaction.response_time_ms = args.response_ms;
    interaction.trace_id = args.trace_id;
    interaction.business_metadata = business_metadata;

    let record = state.tracker.log_chat_interaction(interaction).await?;

    if json {
        return print_json(&record);
    }
    println!();
    println!(
        "  {} Interaction logged to session {}",
        style("✓").green().bold(),
        style(args.session).cyan()
    );
    println!(
        "  User message:      {}",
        style(record.user_message_id).dim()
    );
    println!(
        "  Assistant message: {}",
        style(record.assistant_message_id).dim()
    );
    println!();
    Ok(())
}

/// Token usage from whichever counts were given; `None` when neither was.
fn usage_from(prompt: Option<u32>, completion: Option<u32>) -> Option<TokenUsage> {
    if prompt.is_none() && completion.is_none() {
        return None;
    }
    let total = match (prompt, completion) {
        (Some(p), Some(c)) => Some(p.saturating_add(c)),
        _ => None,
    };
    Some(TokenUsage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: total,
    })
}
