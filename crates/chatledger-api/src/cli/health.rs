//! `chatledger health`: probe the database and the trace sink.

use anyhow::Result;
use chatledger_types::health::{ConnectionState, ServiceState};
use console::{StyledObject, style};

use super::print_json;
use crate::state::AppState;

pub async fn health(state: &AppState, json: bool) -> Result<()> {
    let status = state.tracker.get_health_status().await;

    if json {
        return print_json(&status);
    }

    println!();
    println!(
        "  {} chatledger v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  {}", style("── Connections ──").dim());
    println!("  Database: {}", connection(status.database));
    println!("  Trace:    {}", connection(status.trace));
    if !state.tracker.forwarder().is_enabled() {
        println!(
            "            {}",
            style("(forwarding disabled: no API key or trace.enabled = false)").dim()
        );
    }
    println!();
    println!("  {}", style("── Services ──").dim());
    println!("  Session:    {}", service(status.services.session));
    println!("  Analytics:  {}", service(status.services.analytics));
    println!("  Monitoring: {}", service(status.services.monitoring));
    println!();
    println!("  {}", style("── System ──").dim());
    println!(
        "  Database URL: {}",
        style(&state.config.database.url).dim()
    );
    println!(
        "  Trace project: {}",
        style(&state.config.trace.project).dim()
    );
    println!();
    Ok(())
}

fn connection(state: ConnectionState) -> StyledObject<String> {
    match state {
        ConnectionState::Connected => style(state.to_string()).green(),
        ConnectionState::Disconnected => style(state.to_string()).red(),
    }
}

fn service(state: ServiceState) -> StyledObject<String> {
    match state {
        ServiceState::Active => style(state.to_string()).green(),
        ServiceState::Degraded => style(state.to_string()).yellow(),
    }
}
