//! Server health state machine.
//!
//! # States
//! - Healthy: server is a selection candidate
//! - Unhealthy: server excluded from selection
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: error_count >= unhealthy_threshold
//!                      (live traffic or failed probe, whichever crosses first)
//! Unhealthy → Healthy: successful probe only
//! ```
//!
//! # Design Decisions
//! - Demotion is immediate, recovery waits for the next probe tick
//! - Successful requests decay the error counter instead of resetting it
//! - Every transition is reported to the caller so it can be logged

use serde::Serialize;

/// Health of a single server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn is_healthy(self) -> bool {
        self == HealthState::Healthy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        HealthState::Healthy
    }
}

/// A state change that actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthTransition {
    pub from: HealthState,
    pub to: HealthState,
    /// Error count at the moment of the transition.
    pub error_count: u32,
}

impl HealthTransition {
    /// Build a transition, or `None` when `from == to`.
    pub fn between(from: HealthState, to: HealthState, error_count: u32) -> Option<Self> {
        (from != to).then_some(Self { from, to, error_count })
    }
}
