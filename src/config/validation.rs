//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every backend must be an absolute http URL with a host
//! - Validate value ranges (port, intervals, attempt limit)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend hosts expected, none provided")]
    NoBackends,

    #[error("invalid backend address '{address}': {reason}")]
    InvalidBackend { address: String, reason: String },

    #[error("duplicate backend address '{0}'")]
    DuplicateBackend(String),

    #[error("load balancer port not found")]
    MissingPort,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

/// Parse a configured backend string into an upstream URL.
pub fn parse_backend_url(address: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidBackend {
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(address.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.port_or_known_default().is_none() {
        return Err(invalid("missing port".to_string()));
    }
    Ok(url)
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = Vec::with_capacity(config.backends.len());
    for address in &config.backends {
        match parse_backend_url(address) {
            Ok(url) => {
                if seen.contains(&url) {
                    errors.push(ValidationError::DuplicateBackend(address.clone()));
                } else {
                    seen.push(url);
                }
            }
            Err(e) => errors.push(e),
        }
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::MissingPort);
    }
    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroValue("health_check.interval_secs"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("health_check.timeout_secs"));
    }
    if config.retries.max_attempt_limit == 0 {
        errors.push(ValidationError::ZeroValue("retries.max_attempt_limit"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
