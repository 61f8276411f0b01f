//! Session and message persistence abstractions.
//!
//! Defines the `SessionRepository` trait that the infrastructure layer
//! implements for session lifecycle, ordered message writes and retention.

pub mod repository;
