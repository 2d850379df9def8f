//! Least Connections load balancing strategy.

use crate::load_balancer::{server::ServerState, strategy::SelectionStrategy};

/// Least connections selector.
/// Selects the server with the lowest in-flight load.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for LeastConnections {
    fn select<'a>(&self, healthy: &[&'a ServerState]) -> Option<&'a ServerState> {
        // In case of tie, the first one is selected (stability)
        healthy.iter().copied().min_by_key(|s| s.load)
    }

    fn name(&self) -> &'static str {
        "least-connections"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_conn() {
        let lb = LeastConnections::new();
        let mut a = ServerState::new("a", "http://a", 1);
        let mut b = ServerState::new("b", "http://b", 1);

        a.adjust_load(1);
        assert_eq!(lb.select(&[&a, &b]).unwrap().id, "b");

        b.adjust_load(2);
        assert_eq!(lb.select(&[&a, &b]).unwrap().id, "a");
    }

    #[test]
    fn test_tie_picks_first() {
        let lb = LeastConnections::new();
        let a = ServerState::new("a", "http://a", 1);
        let b = ServerState::new("b", "http://b", 1);
        assert_eq!(lb.select(&[&b, &a]).unwrap().id, "b");
        assert!(lb.select(&[]).is_none());
    }
}
