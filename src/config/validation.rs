//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (max runtime > 0, status codes valid)
//! - Check addresses and probe targets parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HealthConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{HealthConfig, ProbeKind};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint.max_runtime_ms must be greater than zero")]
    ZeroMaxRuntime,

    #[error("endpoint.path must start with '/': {0}")]
    InvalidPath(String),

    #[error("endpoint.crit_status_code is not a valid HTTP status: {0}")]
    InvalidStatusCode(u16),

    #[error("invalid socket address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("probe #{index} has an empty description")]
    EmptyDescription { index: usize },

    #[error("probe '{description}' has an invalid target: {target}")]
    InvalidTarget { description: String, target: String },

    #[error("probe '{description}' has an invalid expect_status: {status}")]
    InvalidExpectStatus { description: String, status: u16 },
}

fn is_status_code(code: u16) -> bool {
    (100..=599).contains(&code)
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &HealthConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.endpoint.max_runtime_ms == 0 {
        errors.push(ValidationError::ZeroMaxRuntime);
    }
    if !config.endpoint.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(config.endpoint.path.clone()));
    }
    if !is_status_code(config.endpoint.crit_status_code) {
        errors.push(ValidationError::InvalidStatusCode(config.endpoint.crit_status_code));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    for (index, probe) in config.probes.iter().enumerate() {
        if probe.description.trim().is_empty() {
            errors.push(ValidationError::EmptyDescription { index });
        }

        let target_ok = match probe.kind {
            // Host names are resolved at connect time; only require host:port.
            ProbeKind::Tcp => probe
                .target
                .rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok()),
            // The built-in HTTP client speaks plain HTTP only.
            ProbeKind::Http => Url::parse(&probe.target)
                .map(|u| u.scheme() == "http" && u.host().is_some())
                .unwrap_or(false),
        };
        if !target_ok {
            errors.push(ValidationError::InvalidTarget {
                description: probe.description.clone(),
                target: probe.target.clone(),
            });
        }

        if let Some(status) = probe.expect_status {
            if !is_status_code(status) {
                errors.push(ValidationError::InvalidExpectStatus {
                    description: probe.description.clone(),
                    status,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
