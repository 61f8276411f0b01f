//! chatledger CLI entry point.
//!
//! Binary name: `chatledger`
//!
//! Parses CLI arguments, loads configuration, wires the tracker, then
//! dispatches to the command handler. Background trace forwards are drained
//! before the process exits.

mod cli;
mod state;

use anyhow::Context;
use clap::Parser;

use chatledger_infra::config::load_app_config;
use chatledger_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, MaintenanceCommand, SessionCommand, StatsCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; explicit env vars still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing(filter_for_verbosity(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let config = load_app_config(&cli.config)
        .await
        .context("Failed to load configuration")?;
    tracing::debug!(path = %cli.config.display(), ?config, "Configuration loaded");
    let state = AppState::init(config).await?;

    let result = run(&state, cli.command, cli.json).await;

    state.shutdown().await;
    shutdown_tracing();
    result
}

async fn run(state: &AppState, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Health => cli::health::health(state, json).await,

        Commands::Session { action } => match action {
            SessionCommand::Create {
                store,
                user,
                metadata,
            } => cli::session::create_session(state, store, user, metadata.as_deref(), json).await,
            SessionCommand::Find { store, user } => {
                cli::session::find_session(state, store, user, json).await
            }
            SessionCommand::Show { id, limit } => {
                cli::session::show_session(state, id, limit, json).await
            }
            SessionCommand::List { store, user, limit } => {
                cli::session::list_sessions(state, &store, &user, limit, json).await
            }
            SessionCommand::End { id } => cli::session::end_session(state, id, json).await,
        },

        Commands::Log(args) => cli::log::log_interaction(state, args, json).await,

        Commands::Feedback(args) => cli::feedback::add_feedback(state, args, json).await,

        Commands::Stats { action } => match action {
            StatsCommand::Session { id } => cli::stats::session_stats(state, id, json).await,
            StatsCommand::Daily { store, date } => {
                cli::stats::daily_stats(state, &store, date, json).await
            }
            StatsCommand::Performance { store, days } => {
                cli::stats::performance(state, &store, days, json).await
            }
        },

        Commands::Maintenance { action } => match action {
            MaintenanceCommand::Cleanup => cli::maintenance::cleanup(state, json).await,
            MaintenanceCommand::Purge => cli::maintenance::purge(state, json).await,
        },

        Commands::Ask {
            session,
            message,
            metadata,
        } => cli::ask::ask(state, session, &message, metadata.as_deref(), json).await,
    }
}
