//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::{server::ServerState, strategy::SelectionStrategy};

/// Round-robin selector.
/// One cursor shared across calls, advanced on every selection.
///
/// The index is taken modulo the size of the healthy set at call time, so
/// fairness only holds while that set does not change.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl SelectionStrategy for RoundRobin {
    fn select<'a>(&self, healthy: &[&'a ServerState]) -> Option<&'a ServerState> {
        let position = self.cursor.fetch_add(1, Ordering::Relaxed);
        if healthy.is_empty() {
            return None;
        }
        Some(healthy[position % healthy.len()])
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn membership_changed(&self, healthy_len: usize) {
        let current = self.cursor.load(Ordering::Relaxed);
        let reduced = if healthy_len == 0 { 0 } else { current % healthy_len };
        self.cursor.store(reduced, Ordering::Relaxed);
    }
}
