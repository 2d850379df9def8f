//! Selection strategy contract and construction.

use std::fmt;
use std::str::FromStr;

use crate::load_balancer::{
    first_available::FirstAvailable, least_conn::LeastConnections, response_time::FastestResponse,
    round_robin::RoundRobin, server::ServerState, weighted::WeightedRandom,
};

/// Picks one server out of the currently healthy set.
///
/// `healthy` is recomputed by the caller on every selection and never
/// contains unhealthy servers. An empty slice must yield `None`.
pub trait SelectionStrategy: Send + Sync + fmt::Debug {
    fn select<'a>(&self, healthy: &[&'a ServerState]) -> Option<&'a ServerState>;

    /// Name reported in aggregate stats.
    fn name(&self) -> &'static str;

    /// Called after servers were registered or removed.
    fn membership_changed(&self, _healthy_len: usize) {}
}

/// The four named strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    RoundRobin,
    LeastConnections,
    Weighted,
    ResponseTime,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::RoundRobin => "round-robin",
            StrategyKind::LeastConnections => "least-connections",
            StrategyKind::Weighted => "weighted",
            StrategyKind::ResponseTime => "response-time",
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::LeastConnections
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a strategy name is not one of the known four.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown selection strategy '{0}'")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "round-robin" => Ok(StrategyKind::RoundRobin),
            "least-connections" => Ok(StrategyKind::LeastConnections),
            "weighted" => Ok(StrategyKind::Weighted),
            "response-time" => Ok(StrategyKind::ResponseTime),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Build the strategy for a configured name.
///
/// Unknown names never fail construction: they degrade to
/// [`FirstAvailable`], which always picks the first healthy server.
pub fn build_strategy(name: &str) -> Box<dyn SelectionStrategy> {
    match name.parse::<StrategyKind>() {
        Ok(kind) => strategy_for(kind),
        Err(e) => {
            tracing::warn!(error = %e, fallback = "first-available", "Falling back to first available server");
            Box::new(FirstAvailable)
        }
    }
}

pub fn strategy_for(kind: StrategyKind) -> Box<dyn SelectionStrategy> {
    match kind {
        StrategyKind::RoundRobin => Box::new(RoundRobin::new()),
        StrategyKind::LeastConnections => Box::new(LeastConnections::new()),
        StrategyKind::Weighted => Box::new(WeightedRandom::new()),
        StrategyKind::ResponseTime => Box::new(FastestResponse::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("round-robin".parse(), Ok(StrategyKind::RoundRobin));
        assert_eq!("least-connections".parse(), Ok(StrategyKind::LeastConnections));
        assert_eq!("weighted".parse(), Ok(StrategyKind::Weighted));
        assert_eq!("response-time".parse(), Ok(StrategyKind::ResponseTime));
        assert!("random".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_build_reports_name() {
        assert_eq!(build_strategy("weighted").name(), "weighted");
        assert_eq!(build_strategy("least-connections").name(), "least-connections");
        assert_eq!(build_strategy("ip-hash").name(), "first-available");
    }
}
