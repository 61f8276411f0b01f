//! `chatledger feedback`: attach a score to a traced run.

use anyhow::Result;
use chatledger_types::trace::UserFeedback;
use console::style;

use super::{FeedbackArgs, print_json};
use crate::state::AppState;

pub async fn add_feedback(state: &AppState, args: FeedbackArgs, json: bool) -> Result<()> {
    let mut feedback = UserFeedback::new(args.trace_id, args.score);
    feedback.comment = args.comment;
    if let Some(key) = args.key {
        feedback.key = key;
    }

    // Best-effort: a sink failure is logged, never returned.
    state.tracker.add_user_feedback(&feedback).await;
    let forwarded = state.tracker.forwarder().is_enabled();

    if json {
        return print_json(&serde_json::json!({
            "trace_id": feedback.trace_id,
            "key": feedback.key,
            "score": feedback.score,
            "forwarding_enabled": forwarded,
        }));
    }
    println!();
    if forwarded {
        println!(
            "  {} Feedback '{}' = {} sent for run {}",
            style("✓").green().bold(),
            feedback.key,
            feedback.score,
            style(&feedback.trace_id).cyan()
        );
    } else {
        println!(
            "  {} Trace forwarding is disabled; feedback was not sent",
            style("!").yellow().bold()
        );
    }
    println!();
    Ok(())
}
