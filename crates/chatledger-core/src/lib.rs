//! Business logic and repository trait definitions for chatledger.
//!
//! This crate defines the "ports" (repository, trace sink and model provider
//! traits) that the infrastructure layer implements, plus the logic that
//! composes them. It depends only on `chatledger-types` -- never on
//! `chatledger-infra` or any database/IO crate.

pub mod analytics;
pub mod llm;
pub mod session;
pub mod trace;
pub mod tracker;
