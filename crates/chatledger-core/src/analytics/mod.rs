//! Read-only analytics over sessions and messages.

pub mod percentile;
pub mod repository;
pub mod tokens;
