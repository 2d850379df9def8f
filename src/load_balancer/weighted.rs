//! Weighted random load balancing strategy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::load_balancer::{server::ServerState, strategy::SelectionStrategy};

/// Picks a server with probability proportional to its weight.
///
/// Servers with weight 0 are filtered out before the draw and can never be
/// chosen. If no healthy server has a positive weight, nothing is selected.
#[derive(Debug)]
pub struct WeightedRandom {
    rng: Mutex<StdRng>,
}

impl WeightedRandom {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic draws, for reproducible distributions.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for WeightedRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStrategy for WeightedRandom {
    fn select<'a>(&self, healthy: &[&'a ServerState]) -> Option<&'a ServerState> {
        let candidates: Vec<&'a ServerState> =
            healthy.iter().copied().filter(|s| s.weight > 0).collect();

        let total: u64 = candidates.iter().map(|s| u64::from(s.weight)).sum();
        if total == 0 {
            return None;
        }

        let mut remaining = self
            .rng
            .lock()
            .expect("weighted rng mutex poisoned")
            .gen_range(0..total);

        for &server in &candidates {
            let weight = u64::from(server.weight);
            if remaining < weight {
                return Some(server);
            }
            remaining -= weight;
        }

        // remaining < total, so the walk always lands on a candidate.
        candidates.last().copied()
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_weight_never_selected() {
        let lb = WeightedRandom::seeded(7);
        let a = ServerState::new("a", "http://a", 0);
        let b = ServerState::new("b", "http://b", 2);
        let c = ServerState::new("c", "http://c", 0);

        for _ in 0..500 {
            assert_eq!(lb.select(&[&a, &b, &c]).unwrap().id, "b");
        }
    }

    #[test]
    fn test_all_zero_weights_selects_nothing() {
        let lb = WeightedRandom::seeded(7);
        let a = ServerState::new("a", "http://a", 0);
        assert!(lb.select(&[&a]).is_none());
        assert!(lb.select(&[]).is_none());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = ServerState::new("a", "http://a", 1);
        let b = ServerState::new("b", "http://b", 1);
        let picks = |lb: &WeightedRandom| -> Vec<String> {
            (0..20).map(|_| lb.select(&[&a, &b]).unwrap().id.clone()).collect()
        };
        assert_eq!(picks(&WeightedRandom::seeded(42)), picks(&WeightedRandom::seeded(42)));
    }
}
