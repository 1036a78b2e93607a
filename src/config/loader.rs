//! Configuration loading from disk and command-line overrides.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, Strategy};
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

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub backends: Option<String>,
    pub strategy: Option<Strategy>,
    pub log_level: Option<String>,
}

impl Overrides {
    /// Apply the overrides onto a parsed configuration.
    pub fn apply(self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(list) = self.backends {
            config.backends = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    resolve_config(Some(path), Overrides::default())
}

/// Resolve the startup configuration: optional file, then overrides, then validation.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: Overrides,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ProxyConfig::default(),
    };
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
backends = ["http://127.0.0.1:3031", "http://127.0.0.1:3032"]
strategy = "least-connections"

[listener]
port = 8000

[health_check]
interval_secs = 5

[retries]
retry_limit = 2
"#;

    #[test]
    fn parses_toml_with_defaults() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.listener.port, 8000);
        assert_eq!(config.listener.bind_host, "0.0.0.0");
        assert_eq!(config.strategy, Strategy::LeastConnections);
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.health_check.interval_secs, 5);
        assert_eq!(config.health_check.timeout_secs, 10);
        assert_eq!(config.retries.retry_limit, 2);
        assert_eq!(config.retries.max_attempt_limit, 3);
        assert_eq!(config.retries.base_delay_ms, 50);
    }

    #[test]
    fn rejects_unknown_strategy() {
        let err = parse_config("strategy = \"random\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = parse_config(SAMPLE).unwrap();
        Overrides {
            port: Some(9000),
            backends: Some("http://a:1, http://b:2,".into()),
            strategy: Some(Strategy::RoundRobin),
            log_level: None,
        }
        .apply(&mut config);

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.backends, vec!["http://a:1", "http://b:2"]);
        assert_eq!(config.strategy, Strategy::RoundRobin);
    }

    #[test]
    fn resolve_without_backends_is_fatal() {
        let err = resolve_config(None, Overrides::default()).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::NoBackends]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/lb-proxy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
