//! Retention sweeps. Both are idempotent.

use anyhow::Result;
use console::style;

use super::print_json;
use crate::state::AppState;

pub async fn cleanup(state: &AppState, json: bool) -> Result<()> {
    let count = state.tracker.cleanup_expired_sessions().await?;
    report("expired_sessions_cleaned", "Soft-deleted", count, json)
}

pub async fn purge(state: &AppState, json: bool) -> Result<()> {
    let count = state.tracker.hard_delete_old_data().await?;
    report("sessions_purged", "Permanently deleted", count, json)
}

fn report(key: &str, verb: &str, count: u64, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({ key: count }));
    }
    println!();
    println!(
        "  {} {} {} session{}",
        style("✓").green().bold(),
        verb,
        style(count).bold(),
        if count == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}
