//! The chat tracker facade composing persistence, analytics and tracing.

pub mod service;
