//! Best-effort forwarding of interaction metrics to an external trace sink.

pub mod forwarder;
pub mod sink;
