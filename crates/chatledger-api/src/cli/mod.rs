//! CLI command definitions for the `chatledger` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by
//! noun (`session`, `stats`, `maintenance`) with a few top-level verbs
//! (`log`, `feedback`, `ask`, `health`).

pub mod ask;
pub mod feedback;
pub mod health;
pub mod log;
pub mod maintenance;
pub mod session;
pub mod stats;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chatledger_infra::config::DEFAULT_CONFIG_FILE;
use chatledger_types::chat::Metadata;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

/// Session tracking and analytics for RAG chatbots.
#[derive(Parser)]
#[command(name = "chatledger", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "CHATLEDGER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe the database and the trace sink.
    Health,

    /// Create, find, inspect and end sessions.
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Record one user/assistant exchange.
    Log(LogArgs),

    /// Attach user feedback to a traced run.
    Feedback(FeedbackArgs),

    /// Session, daily and performance analytics.
    Stats {
        #[command(subcommand)]
        action: StatsCommand,
    },

    /// Retention sweeps.
    Maintenance {
        #[command(subcommand)]
        action: MaintenanceCommand,
    },

    /// Ask the configured model within a session and log the exchange.
    Ask {
        /// Session to continue.
        #[arg(long)]
        session: Uuid,

        /// The user message.
        message: String,

        /// Business metadata as a JSON object.
        #[arg(long)]
        metadata: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Start a new session for a store/user pair.
    Create {
        #[arg(long)]
        store: String,
        #[arg(long)]
        user: String,
        /// Session metadata as a JSON object.
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Print the most recently active live session for a store/user pair.
    Find {
        #[arg(long)]
        store: String,
        #[arg(long)]
        user: String,
    },

    /// Show a live session with its recent messages.
    Show {
        id: Uuid,
        /// Number of recent messages to include.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// List sessions for a store/user pair, most recently active first.
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        store: String,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// Mark a session inactive.
    End { id: Uuid },
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(long)]
    pub session: Uuid,
    #[arg(long)]
    pub user_message: String,
    #[arg(long)]
    pub assistant_response: String,
    #[arg(long)]
    pub prompt_tokens: Option<u32>,
    #[arg(long)]
    pub completion_tokens: Option<u32>,
    /// Model latency in milliseconds.
    #[arg(long = "response-ms")]
    pub response_ms: Option<u64>,
    #[arg(long)]
    pub trace_id: Option<String>,
    /// Business metadata as a JSON object (e.g. {"category":"shipping"}).
    #[arg(long)]
    pub metadata: Option<String>,
}

#[derive(Args)]
pub struct FeedbackArgs {
    /// Run identifier in the trace sink.
    #[arg(long)]
    pub trace_id: String,
    #[arg(long)]
    pub score: f64,
    #[arg(long)]
    pub comment: Option<String>,
    /// Feedback key (defaults to user_rating).
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Subcommand)]
pub enum StatsCommand {
    /// Aggregates for one session.
    Session { id: Uuid },

    /// Aggregates for sessions a store created on one UTC day.
    Daily {
        #[arg(long)]
        store: String,
        /// Calendar day (YYYY-MM-DD); defaults to today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Latency percentiles, token usage and error rate over a trailing window.
    Performance {
        #[arg(long)]
        store: String,
        /// Window in days (defaults to 7).
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum MaintenanceCommand {
    /// Soft-delete sessions past their expiry.
    Cleanup,
    /// Permanently remove sessions soft-deleted beyond the retention window.
    Purge,
}

/// Parse an optional `--metadata` argument into a JSON object.
pub fn parse_metadata(raw: Option<&str>) -> Result<Option<Metadata>> {
    raw.map(|s| {
        serde_json::from_str::<Metadata>(s).context("--metadata must be a JSON object")
    })
    .transpose()
}

/// Print `value` as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Compact token count for display (1.2K, 3.4M).
pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_log_command() {
        let cli = Cli::try_parse_from([
            "chatledger",
            "log",
            "--session",
            "0192f0c1-7a3e-7cc0-8f1e-2b7d4c1a9e10",
            "--user-message",
            "hi",
            "--assistant-response",
            "hello",
            "--response-ms",
            "120",
        ])
        .unwrap();
        match cli.command {
            Commands::Log(args) => {
                assert_eq!(args.user_message, "hi");
                assert_eq!(args.response_ms, Some(120));
                assert!(args.prompt_tokens.is_none());
            }
            _ => panic!("expected log command"),
        }
    }

    #[test]
    fn metadata_must_be_an_object() {
        let parsed = parse_metadata(Some(r#"{"category":"shipping"}"#))
            .unwrap()
            .unwrap();
        assert_eq!(parsed["category"], "shipping");
        assert!(parse_metadata(Some("[1,2]")).is_err());
        assert!(parse_metadata(None).unwrap().is_none());
    }

    #[test]
    fn format_tokens_abbreviates() {
        assert_eq!(format_tokens(950), "950");
        assert_eq!(format_tokens(1_500), "1.5K");
        assert_eq!(format_tokens(2_000_000), "2.0M");
    }
}
