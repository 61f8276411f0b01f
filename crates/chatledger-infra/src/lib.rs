//! Infrastructure layer for chatledger.
//!
//! Contains implementations of the traits defined in `chatledger-core`:
//! SQLite session and analytics storage, the HTTP trace sink, the
//! OpenAI-compatible model provider, and configuration loading.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod trace;
