//! Scoped dispatch of one request to one server.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use crate::load_balancer::{balancer::LoadBalancer, server::ServerState};

/// A RAII guard for one in-flight request.
///
/// Created by [`LoadBalancer::dispatch`] after the server's load was
/// incremented. Dropping it records the outcome and the elapsed time, then
/// decrements the load, on every exit path. A guard dropped without an
/// outcome (cancelled, timed out, panicked handler) counts as a failure.
#[derive(Debug)]
pub struct DispatchGuard {
    balancer: Arc<LoadBalancer>,
    server: ServerState,
    started: Instant,
    outcome: Option<bool>,
}

impl DispatchGuard {
    pub(crate) fn new(balancer: Arc<LoadBalancer>, server: ServerState) -> Self {
        Self {
            balancer,
            server,
            started: Instant::now(),
            outcome: None,
        }
    }

    /// Snapshot of the server taken at dispatch time.
    pub fn server(&self) -> &ServerState {
        &self.server
    }

    /// The server's load including this request.
    pub fn load_at_dispatch(&self) -> u64 {
        self.server.load
    }

    pub fn set_outcome(&mut self, success: bool) {
        self.outcome = Some(success);
    }

    /// Record the outcome and release the server now.
    pub fn finish(mut self, success: bool) {
        self.set_outcome(success);
    }
}

impl Deref for DispatchGuard {
    type Target = ServerState;
    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let success = self.outcome.unwrap_or(false);
        self.balancer.record_request(&self.server.id, elapsed_ms, success);
        self.balancer.update_load(&self.server.id, -1);
    }
}
