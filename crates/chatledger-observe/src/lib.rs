//! Observability setup for chatledger: structured logging with an optional
//! OpenTelemetry bridge.

pub mod tracing_setup;
