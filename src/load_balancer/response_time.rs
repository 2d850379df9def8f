//! Fastest-response load balancing strategy.

use crate::load_balancer::{server::ServerState, strategy::SelectionStrategy};

/// Selects the server with the lowest smoothed response time.
/// Ties go to the first server in registration order.
#[derive(Debug, Default)]
pub struct FastestResponse;

impl FastestResponse {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for FastestResponse {
    fn select<'a>(&self, healthy: &[&'a ServerState]) -> Option<&'a ServerState> {
        healthy
            .iter()
            .copied()
            .min_by(|a, b| a.response_time.total_cmp(&b.response_time))
    }

    fn name(&self) -> &'static str {
        "response-time"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_fastest() {
        let lb = FastestResponse::new();
        let mut a = ServerState::new("a", "http://a", 1);
        let mut b = ServerState::new("b", "http://b", 1);
        a.response_time = 120.0;
        b.response_time = 35.5;
        assert_eq!(lb.select(&[&a, &b]).unwrap().id, "b");
    }

    #[test]
    fn test_unmeasured_servers_tie_on_zero() {
        let lb = FastestResponse::new();
        let a = ServerState::new("a", "http://a", 1);
        let b = ServerState::new("b", "http://b", 1);
        assert_eq!(lb.select(&[&a, &b]).unwrap().id, "a");
    }
}
