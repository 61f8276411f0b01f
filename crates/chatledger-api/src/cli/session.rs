//! Session CLI commands: create, find, show, list, end.

use anyhow::Result;
use chatledger_types::chat::{MessageRole, NewSession, Session, SessionLookup};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use super::{parse_metadata, print_json};
use crate::state::AppState;

pub async fn create_session(
    state: &AppState,
    store: String,
    user: String,
    metadata: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut new_session = NewSession::new(store, user);
    if let Some(metadata) = parse_metadata(metadata)? {
        new_session = new_session.with_metadata(metadata);
    }
    let id = state.tracker.create_session(&new_session).await?;

    if json {
        return print_json(&serde_json::json!({ "session_id": id }));
    }
    println!();
    println!(
        "  {} Session created: {}",
        style("✓").green().bold(),
        style(id).cyan()
    );
    println!();
    Ok(())
}

pub async fn find_session(state: &AppState, store: String, user: String, json: bool) -> Result<()> {
    let lookup = SessionLookup {
        store_id: store,
        user_id: user,
    };
    let found = state.tracker.find_active_session(&lookup).await?;

    if json {
        return print_json(&serde_json::json!({ "session_id": found }));
    }
    println!();
    match found {
        Some(id) => println!("  Active session: {}", style(id).cyan()),
        None => println!(
            "  {} No live session for store '{}' and user '{}'",
            style("i").blue().bold(),
            lookup.store_id,
            lookup.user_id
        ),
    }
    println!();
    Ok(())
}

pub async fn show_session(
    state: &AppState,
    session_id: Uuid,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let context = state
        .tracker
        .get_session_context(&session_id, limit)
        .await?;

    if json {
        return print_json(&context);
    }

    let session = &context.session;
    println!();
    println!("  Session {}", style(session.id).cyan().bold());
    println!("  Store:       {}", session.store_id);
    println!("  User:        {}", session.user_id);
    println!(
        "  Created:     {}",
        session.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!(
        "  Last active: {}",
        session.last_active_at.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(expires_at) = session.expires_at {
        println!(
            "  Expires:     {}",
            style(expires_at.format("%Y-%m-%d %H:%M UTC")).dim()
        );
    }
    println!();

    if context.recent_messages.is_empty() {
        println!("  {}", style("(no messages yet)").dim());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Content").fg(Color::White),
        Cell::new("Tokens").fg(Color::White),
        Cell::new("Latency").fg(Color::White),
    ]);

    for message in &context.recent_messages {
        let role_cell = match message.role {
            MessageRole::User => Cell::new("user").fg(Color::Cyan),
            MessageRole::Assistant => Cell::new("assistant").fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(message.sequence_number.to_string()).fg(Color::DarkGrey),
            role_cell,
            Cell::new(truncate(&message.content, 60)),
            Cell::new(
                message
                    .token_count
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(
                message
                    .response_time_ms
                    .map(|ms| format!("{ms} ms"))
                    .unwrap_or_else(|| "-".to_string()),
            )
            .fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();
    Ok(())
}

pub async fn list_sessions(
    state: &AppState,
    store: &str,
    user: &str,
    limit: i64,
    json: bool,
) -> Result<()> {
    let sessions = state.tracker.list_sessions(store, user, limit).await?;

    if json {
        return print_json(&sessions);
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions found. Start one with: {}",
            style("i").blue().bold(),
            style(format!("chatledger session create --store {store} --user {user}")).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Created").fg(Color::White),
        Cell::new("Last active").fg(Color::White),
        Cell::new("Status").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(session.id.to_string()).fg(Color::Cyan),
            Cell::new(session.created_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(session.last_active_at.format("%Y-%m-%d %H:%M").to_string()),
            status_cell(session),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

pub async fn end_session(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    state.tracker.end_session(&session_id).await?;

    if json {
        return print_json(&serde_json::json!({ "session_id": session_id, "ended": true }));
    }
    println!();
    println!(
        "  {} Session {} ended",
        style("✓").green().bold(),
        style(session_id).cyan()
    );
    println!();
    Ok(())
}

fn status_cell(session: &Session) -> Cell {
    if session.deleted_at.is_some() {
        Cell::new("deleted").fg(Color::Red)
    } else if !session.is_active {
        Cell::new("ended").fg(Color::DarkGrey)
    } else if session.is_live() {
        Cell::new("live").fg(Color::Green)
    } else {
        Cell::new("expired").fg(Color::Yellow)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > max_chars {
        let head: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        flat
    }
}
