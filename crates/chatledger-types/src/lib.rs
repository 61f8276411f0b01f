//! Shared domain types for chatledger.
//!
//! Sessions, messages, analytics results, trace payloads, health reports,
//! configuration, and the error taxonomy shared by every other crate.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod analytics;
pub mod chat;
pub mod config;
pub mod error;
pub mod health;
pub mod llm;
pub mod trace;
