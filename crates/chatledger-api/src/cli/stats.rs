//! Analytics CLI commands: per-session, per-store-day and performance.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use super::{format_tokens, print_json};
use crate::state::AppState;

pub async fn session_stats(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let stats = state.tracker.get_session_stats(&session_id).await?;

    if json {
        return print_json(&stats);
    }
    println!();
    println!("  Session {}", style(stats.session_id).cyan().bold());
    println!("  Messages:      {}", style(stats.message_count).bold());
    println!("  Tokens:        {}", format_tokens(stats.total_tokens));
    println!("  Avg response:  {:.0} ms", stats.avg_response_time);
    println!(
        "  Last activity: {}",
        stats.last_active_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!();
    Ok(())
}

pub async fn daily_stats(
    state: &AppState,
    store: &str,
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let stats = state.tracker.get_store_daily_stats(store, date).await?;

    if json {
        return print_json(&stats);
    }
    println!();
    println!(
        "  {} on {}",
        style(&stats.store_id).cyan().bold(),
        stats.date
    );
    println!("  Sessions:     {}", style(stats.session_count).bold());
    println!("  Messages:     {}", stats.message_count);
    println!("  Tokens:       {}", format_tokens(stats.total_tokens));
    println!("  Avg response: {:.0} ms", stats.avg_response_time);
    println!();

    if stats.top_categories.is_empty() {
        println!("  {}", style("(no categorized messages)").dim());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Category").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
    ]);
    for category in &stats.top_categories {
        table.add_row(vec![
            Cell::new(&category.category).fg(Color::Cyan),
            Cell::new(category.count.to_string()),
        ]);
    }
    println!("{table}");
    println!();
    Ok(())
}

pub async fn performance(
    state: &AppState,
    store: &str,
    days: Option<u32>,
    json: bool,
) -> Result<()> {
    let metrics = state.tracker.get_performance_metrics(store, days).await?;

    if json {
        return print_json(&metrics);
    }

    let error_style = if metrics.error_rate > 5.0 {
        style(format!("{:.1}%", metrics.error_rate)).red()
    } else {
        style(format!("{:.1}%", metrics.error_rate)).green()
    };

    println!();
    println!(
        "  {} over the last {} day{}",
        style(&metrics.store_id).cyan().bold(),
        metrics.window_days,
        if metrics.window_days == 1 { "" } else { "s" }
    );
    println!();
    println!("  {}", style("── Latency ──").dim());
    println!("  Average: {:.0} ms", metrics.avg_response_time);
    println!("  p50:     {:.0} ms", metrics.percentiles.p50);
    println!("  p95:     {:.0} ms", metrics.percentiles.p95);
    println!("  p99:     {:.0} ms", metrics.percentiles.p99);
    println!();
    println!("  {}", style("── Tokens ──").dim());
    println!(
        "  Total:       {}",
        format_tokens(metrics.token_usage_stats.total)
    );
    println!("  Per message: {:.1}", metrics.token_usage_stats.avg);
    println!();
    println!("  Error rate: {error_style}");
    println!();
    Ok(())
}
