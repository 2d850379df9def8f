//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds and intervals > 0)
//! - Check server URLs and detect duplicate ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - An unknown strategy name is not an error; the balancer degrades instead

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no servers configured")]
    NoServers,

    #[error("server '{id}' has invalid url '{url}': {reason}")]
    InvalidServerUrl { id: String, url: String, reason: String },

    #[error("duplicate server id '{0}'")]
    DuplicateServerId(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    let mut seen = HashSet::new();
    for (index, server) in config.servers.iter().enumerate() {
        let id = server.id.clone().unwrap_or_else(|| index.to_string());

        if let Err(e) = url::Url::parse(&server.url) {
            errors.push(ValidationError::InvalidServerUrl {
                id: id.clone(),
                url: server.url.clone(),
                reason: e.to_string(),
            });
        }

        if server.weight == Some(0) {
            tracing::warn!(server = %id, "Server has weight 0 and will never be picked by the weighted strategy");
        }

        if !seen.insert(id.clone()) {
            errors.push(ValidationError::DuplicateServerId(id));
        }
    }

    if config.balancer.unhealthy_threshold == 0 {
        errors.push(ValidationError::ZeroValue("balancer.unhealthy_threshold"));
    }
    if config.balancer.health_check_interval_ms == 0 {
        errors.push(ValidationError::ZeroValue("balancer.health_check_interval_ms"));
    }
    if config.health_check.timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("health_check.timeout_ms"));
    }
    if config.listener.request_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("listener.request_timeout_ms"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
