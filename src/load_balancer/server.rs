//! Per-server state.
//!
//! # Responsibilities
//! - Represent a single backend target and its live counters
//! - Track in-flight load (never negative)
//! - Smooth response times with an exponential moving average
//! - Apply request outcomes and probe results to the health state machine

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::ServerConfig;
use crate::health::state::{HealthState, HealthTransition};

/// Smoothing factor for the response time average.
pub const EMA_ALPHA: f64 = 0.3;

/// A single registered backend.
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Stable identifier, explicit or the registration index.
    pub id: String,
    /// Opaque target address.
    pub url: String,
    pub health: HealthState,
    /// Requests currently assigned and not yet completed.
    pub load: u64,
    /// Moving average of completed request duration, in milliseconds.
    pub response_time: f64,
    pub request_count: u64,
    /// Decaying failure counter, not a lifetime total.
    pub error_count: u32,
    /// Only consulted by the weighted strategy.
    pub weight: u32,
    /// Time of the most recent health probe.
    pub last_check: Option<SystemTime>,
}

impl ServerState {
    pub fn new(id: impl Into<String>, url: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            health: HealthState::Healthy,
            load: 0,
            response_time: 0.0,
            request_count: 0,
            error_count: 0,
            weight,
            last_check: None,
        }
    }

    /// Build from configuration; `index` is used when no id was given.
    pub fn from_config(index: usize, config: &ServerConfig) -> Self {
        let id = config.id.clone().unwrap_or_else(|| index.to_string());
        Self::new(id, config.url.clone(), config.weight.unwrap_or(1))
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    /// Add `delta` to the in-flight load, clamping at zero. Returns the new load.
    pub fn adjust_load(&mut self, delta: i64) -> u64 {
        self.load = if delta.is_negative() {
            self.load.saturating_sub(delta.unsigned_abs())
        } else {
            self.load.saturating_add(delta as u64)
        };
        self.load
    }

    /// Apply one completed request.
    pub fn record_outcome(
        &mut self,
        duration_ms: f64,
        success: bool,
        unhealthy_threshold: u32,
    ) -> Option<HealthTransition> {
        self.request_count += 1;

        // NaN and negative samples count as zero.
        let sample = duration_ms.max(0.0);
        self.response_time = EMA_ALPHA * sample + (1.0 - EMA_ALPHA) * self.response_time;

        if success {
            self.error_count = self.error_count.saturating_sub(1);
            return None;
        }

        self.register_failure(unhealthy_threshold)
    }

    /// Apply one health probe result.
    pub fn record_probe(&mut self, ok: bool, unhealthy_threshold: u32) -> Option<HealthTransition> {
        self.last_check = Some(SystemTime::now());

        if ok {
            let previous = self.health;
            self.health = HealthState::Healthy;
            self.error_count = 0;
            return HealthTransition::between(previous, self.health, 0);
        }

        self.register_failure(unhealthy_threshold)
    }

    fn register_failure(&mut self, unhealthy_threshold: u32) -> Option<HealthTransition> {
        self.error_count = self.error_count.saturating_add(1);

        if self.is_healthy() && self.error_count >= unhealthy_threshold {
            self.health = HealthState::Unhealthy;
            return HealthTransition::between(
                HealthState::Healthy,
                HealthState::Unhealthy,
                self.error_count,
            );
        }
        None
    }

    /// Errors per completed request, 0 when nothing completed yet.
    pub fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.request_count as f64
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            id: self.id.clone(),
            url: self.url.clone(),
            healthy: self.is_healthy(),
            load: self.load,
            response_time: self.response_time,
            request_count: self.request_count,
            error_count: self.error_count,
            error_rate: self.error_rate(),
            weight: self.weight,
            last_check_ms: self.last_check.and_then(|t| {
                t.duration_since(UNIX_EPOCH).ok().map(|d| d.as_millis() as u64)
            }),
        }
    }
}

/// Serializable per-server snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub id: String,
    pub url: String,
    pub healthy: bool,
    pub load: u64,
    pub response_time: f64,
    pub request_count: u64,
    pub error_count: u32,
    pub error_rate: f64,
    pub weight: u32,
    pub last_check_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_config() {
        let config = ServerConfig {
            id: None,
            url: "http://127.0.0.1:3001".into(),
            weight: None,
        };
        let server = ServerState::from_config(2, &config);
        assert_eq!(server.id, "2");
        assert_eq!(server.weight, 1);
        assert!(server.is_healthy());
        assert_eq!(server.response_time, 0.0);
    }

    #[test]
    fn test_load_clamped_at_zero() {
        let mut server = ServerState::new("a", "http://a", 1);
        assert_eq!(server.adjust_load(-1), 0);
        assert_eq!(server.adjust_load(3), 3);
        assert_eq!(server.adjust_load(-5), 0);
        assert_eq!(server.adjust_load(i64::MIN), 0);
    }

    #[test]
    fn test_ema_first_sample() {
        let mut server = ServerState::new("a", "http://a", 1);
        server.record_outcome(100.0, true, 5);
        assert!((server.response_time - 30.0).abs() < 1e-9);
        server.record_outcome(100.0, true, 5);
        assert!((server.response_time - 51.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_decays_error_count() {
        let mut server = ServerState::new("a", "http://a", 1);
        server.record_outcome(10.0, false, 5);
        server.record_outcome(10.0, false, 5);
        assert_eq!(server.error_count, 2);

        server.record_outcome(10.0, true, 5);
        assert_eq!(server.error_count, 1);
        server.record_outcome(10.0, true, 5);
        server.record_outcome(10.0, true, 5);
        assert_eq!(server.error_count, 0);
        assert!(server.is_healthy());
    }

    #[test]
    fn test_demotion_reports_transition_once() {
        let mut server = ServerState::new("a", "http://a", 1);
        assert!(server.record_outcome(10.0, false, 2).is_none());

        let t = server.record_outcome(10.0, false, 2).expect("demoted");
        assert_eq!(t.to, HealthState::Unhealthy);
        assert_eq!(t.error_count, 2);

        // Already unhealthy: counter keeps climbing, no new transition.
        assert!(server.record_outcome(10.0, false, 2).is_none());
        assert_eq!(server.error_count, 3);
    }

    #[test]
    fn test_probe_success_resets_and_recovers() {
        let mut server = ServerState::new("a", "http://a", 1);
        for _ in 0..3 {
            server.record_outcome(10.0, false, 3);
        }
        assert!(!server.is_healthy());

        let t = server.record_probe(true, 3).expect("recovered");
        assert_eq!(t.to, HealthState::Healthy);
        assert_eq!(server.error_count, 0);
        assert!(server.last_check.is_some());
    }

    #[test]
    fn test_probe_failure_feeds_error_count() {
        let mut server = ServerState::new("a", "http://a", 1);
        assert!(server.record_probe(false, 2).is_none());
        assert!(server.is_healthy());
        assert!(server.record_probe(false, 2).is_some());
        assert!(!server.is_healthy());
        assert!(server.record_probe(false, 2).is_none());
        assert_eq!(server.error_count, 3);
    }

    #[test]
    fn test_error_rate() {
        let mut server = ServerState::new("a", "http://a", 1);
        assert_eq!(server.error_rate(), 0.0);
        server.record_outcome(1.0, false, 10);
        server.record_outcome(1.0, true, 10);
        server.record_outcome(1.0, false, 10);
        server.record_outcome(1.0, false, 10);
        // error_count = 2 after decay, request_count = 4
        assert!((server.error_rate() - 0.5).abs() < 1e-9);
    }
}
