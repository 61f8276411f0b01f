//! Trace sink adapters.

pub mod http_sink;
