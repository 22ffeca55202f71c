//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the health
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the health service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HealthConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Health endpoint settings.
    pub endpoint: EndpointConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Probes declared in the config file, in registration order.
    pub probes: Vec<ProbeConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Route serving the aggregate result.
    pub path: String,

    /// Deadline for one run in milliseconds.
    pub max_runtime_ms: u64,

    /// HTTP status returned when the aggregate is `crit`.
    pub crit_status_code: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            path: "/cloud/health".to_string(),
            max_runtime_ms: 25_000,
            crit_status_code: 200,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Suppress informational logs about individual runs.
    pub silent: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            silent: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Kind of a declarative probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// TCP connect to `target` (host:port).
    Tcp,
    /// HTTP GET of `target` (URL).
    Http,
}

/// A probe declared in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Display name in the `details` list.
    pub description: String,

    pub kind: ProbeKind,

    /// Socket address for `tcp`, URL for `http`.
    pub target: String,

    /// Failure forces the aggregate status to `crit`.
    #[serde(default)]
    pub critical: bool,

    /// Exact status expected from an `http` probe (default: any 2xx).
    #[serde(default)]
    pub expect_status: Option<u16>,
}
