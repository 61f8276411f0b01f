//! Health report returned by the chat tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

/// Reachability of an external dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn from_probe(ok: bool) -> Self {
        if ok {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Operating mode of an internal service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Active,
    Degraded,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Active => write!(f, "active"),
            ServiceState::Degraded => write!(f, "degraded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub session: ServiceState,
    pub analytics: ServiceState,
    pub monitoring: ServiceState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub database: ConnectionState,
    pub trace: ConnectionState,
    pub services: ServiceHealth,
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    /// Build a report from the two connectivity probes.
    ///
    /// Monitoring mirrors the trace probe; session and analytics are always
    /// reported active.
    pub fn from_probes(database_ok: bool, trace_ok: bool) -> Self {
        Self {
            database: ConnectionState::from_probe(database_ok),
            trace: ConnectionState::from_probe(trace_ok),
            services: ServiceHealth {
                session: ServiceState::Active,
                analytics: ServiceState::Active,
                monitoring: if trace_ok {
                    ServiceState::Active
                } else {
                    ServiceState::Degraded
                },
            },
            checked_at: Utc::now(),
        }
    }
}
