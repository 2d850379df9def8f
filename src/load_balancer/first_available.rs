//! Pass-through used when the configured strategy name is not recognised.

use crate::load_balancer::{server::ServerState, strategy::SelectionStrategy};

/// Always returns the first healthy server.
#[derive(Debug, Default)]
pub struct FirstAvailable;

impl SelectionStrategy for FirstAvailable {
    fn select<'a>(&self, healthy: &[&'a ServerState]) -> Option<&'a ServerState> {
        healthy.first().copied()
    }

    fn name(&self) -> &'static str {
        "first-available"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_first() {
        let a = ServerState::new("a", "http://a", 1);
        let b = ServerState::new("b", "http://b", 1);
        for _ in 0..3 {
            assert_eq!(FirstAvailable.select(&[&a, &b]).unwrap().id, "a");
        }
        assert!(FirstAvailable.select(&[]).is_none());
    }
}
