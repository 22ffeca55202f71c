//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::HealthConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<HealthConfig, ConfigError> {
    let config: HealthConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HealthConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProbeKind;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:8088"

            [endpoint]
            path = "/status/health"
            max_runtime_ms = 500

            [observability]
            silent = true

            [[probes]]
            description = "Postgres reachable"
            kind = "tcp"
            target = "127.0.0.1:5432"
            critical = true

            [[probes]]
            description = "Search API"
            kind = "http"
            target = "http://127.0.0.1:9200/_cluster/health"
            expect_status = 200
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8088");
        assert_eq!(config.endpoint.path, "/status/health");
        assert_eq!(config.endpoint.max_runtime_ms, 500);
        assert_eq!(config.endpoint.crit_status_code, 200);
        assert!(config.observability.silent);
        assert_eq!(config.probes.len(), 2);
        assert_eq!(config.probes[0].kind, ProbeKind::Tcp);
        assert!(config.probes[0].critical);
        assert_eq!(config.probes[1].expect_status, Some(200));
        assert!(!config.probes[1].critical);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.endpoint.path, "/cloud/health");
        assert_eq!(config.endpoint.max_runtime_ms, 25_000);
        assert!(config.probes.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(parse_config("[endpoint"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config("[endpoint]\nmax_runtime_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("max_runtime_ms"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
