//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! balancer and the host proxy around it.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Selection and health thresholds.
    pub balancer: BalancerConfig,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Backend servers, in registration order.
    pub servers: Vec<ServerConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for a proxied request, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Load balancer configuration, immutable once the balancer is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// One of `round-robin`, `least-connections`, `weighted`, `response-time`.
    /// Anything else falls back to the first healthy server.
    pub strategy: String,

    /// Interval between health-check ticks, in milliseconds.
    pub health_check_interval_ms: u64,

    /// Error count at which a server is marked unhealthy.
    pub unhealthy_threshold: u32,

    /// Reserved for windowed response-time tracking; currently advisory.
    pub response_time_window_ms: u64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            strategy: "least-connections".to_string(),
            health_check_interval_ms: 10_000,
            unhealthy_threshold: 5,
            response_time_window_ms: 60_000,
        }
    }
}

/// A backend server descriptor.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Unique server identifier (default: registration index).
    #[serde(default)]
    pub id: Option<String>,

    /// Target base URL (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Weight for weighted selection (default: 1).
    #[serde(default)]
    pub weight: Option<u32>,
}

impl ServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            weight: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// How servers are probed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// `GET <url><path>`, healthy on a 2xx status.
    #[default]
    Http,
    /// Every probe succeeds.
    None,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic health-check loop.
    pub enabled: bool,

    /// Probe implementation.
    pub kind: ProbeKind,

    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Per-probe timeout in milliseconds (HTTP probe only).
    pub timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: ProbeKind::Http,
            path: "/health".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [[servers]]
            url = "http://127.0.0.1:3001"

            [[servers]]
            id = "b"
            url = "http://127.0.0.1:3002"
            weight = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.balancer.strategy, "least-connections");
        assert_eq!(config.balancer.health_check_interval_ms, 10_000);
        assert_eq!(config.balancer.unhealthy_threshold, 5);
        assert_eq!(config.balancer.response_time_window_ms, 60_000);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].id, None);
        assert_eq!(config.servers[1].weight, Some(3));
        assert_eq!(config.health_check.kind, ProbeKind::Http);
    }

    #[test]
    fn test_probe_kind_none() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [health_check]
            kind = "none"
            "#,
        )
        .unwrap();
        assert_eq!(config.health_check.kind, ProbeKind::None);
        assert!(config.health_check.enabled);
    }
}
