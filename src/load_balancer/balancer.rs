//! The health-aware load balancer.
//!
//! # Responsibilities
//! - Own the registered servers and the selection strategy
//! - Select a healthy server per request
//! - Record request outcomes and in-flight load
//! - Drive the periodic health-check loop
//! - Report per-server and aggregate statistics
//!
//! # Design Decisions
//! - One mutex over the server set; every mutation is a short critical section
//! - The lock is never held across a probe await
//! - Unknown server ids are ignored, never errors

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::{BalancerConfig, ServerConfig};
use crate::health::monitor::HealthMonitor;
use crate::health::probe::{AlwaysHealthy, HealthProbe, ProbeError};
use crate::health::state::HealthTransition;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{
    guard::DispatchGuard,
    server::{ServerState, ServerStats},
    strategy::{build_strategy, SelectionStrategy},
};
use crate::observability::metrics;

/// Process-wide request counters, reset only by [`LoadBalancer::reset_stats`].
#[derive(Debug, Default, Clone, Copy)]
struct RequestCounters {
    total: u64,
    successful: u64,
    failed: u64,
    switches: u64,
}

#[derive(Debug, Default)]
struct Inner {
    servers: Vec<ServerState>,
    counters: RequestCounters,
    last_selected: Option<String>,
}

impl Inner {
    fn server_mut(&mut self, id: &str) -> Option<&mut ServerState> {
        self.servers.iter_mut().find(|s| s.id == id)
    }

    fn healthy_count(&self) -> usize {
        self.servers.iter().filter(|s| s.is_healthy()).count()
    }
}

/// Aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancerStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// `successful / total`, 0 when nothing was recorded.
    pub success_rate: f64,
    pub server_switches: u64,
    pub strategy: String,
    pub healthy_servers: usize,
    pub total_servers: usize,
}

/// Selects backends and tracks their health.
///
/// Construct once and share it by `Arc` with whatever dispatches requests.
/// The health-check loop only runs after [`start_health_checks`] and must
/// be released with [`stop`].
///
/// [`start_health_checks`]: LoadBalancer::start_health_checks
/// [`stop`]: LoadBalancer::stop
pub struct LoadBalancer {
    config: BalancerConfig,
    strategy: Box<dyn SelectionStrategy>,
    probe: Arc<dyn HealthProbe>,
    inner: Mutex<Inner>,
    health_loop: Mutex<Option<Shutdown>>,
}

impl std::fmt::Debug for LoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("config", &self.config)
            .field("strategy", &self.strategy.name())
            .finish_non_exhaustive()
    }
}

impl LoadBalancer {
    /// Build a balancer over `servers` in the given order.
    /// Probes default to [`AlwaysHealthy`].
    pub fn new(config: BalancerConfig, servers: &[ServerConfig]) -> Self {
        let strategy = build_strategy(&config.strategy);
        let servers = servers
            .iter()
            .enumerate()
            .map(|(index, server)| ServerState::from_config(index, server))
            .collect::<Vec<_>>();

        for server in &servers {
            metrics::record_server_health(&server.id, true);
        }

        tracing::info!(
            strategy = strategy.name(),
            servers = servers.len(),
            unhealthy_threshold = config.unhealthy_threshold,
            "Load balancer created"
        );

        Self {
            config,
            strategy,
            probe: Arc::new(AlwaysHealthy),
            inner: Mutex::new(Inner {
                servers,
                ..Inner::default()
            }),
            health_loop: Mutex::new(None),
        }
    }

    /// Replace the health probe.
    pub fn with_probe(mut self, probe: impl HealthProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Replace the health probe with an already shared one.
    pub fn with_shared_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the selection strategy chosen from the configured name.
    pub fn with_strategy(mut self, strategy: Box<dyn SelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("load balancer mutex poisoned")
    }

    // --- Selection ---

    /// Pick a healthy server, or `None` when no server is eligible.
    pub fn select_server(&self) -> Option<ServerState> {
        let mut inner = self.lock();
        let index = self.select_index(&mut inner)?;
        Some(inner.servers[index].clone())
    }

    /// Select a server and count the request against it until the returned
    /// guard is dropped.
    pub fn dispatch(self: &Arc<Self>) -> Option<DispatchGuard> {
        let server = {
            let mut inner = self.lock();
            let index = self.select_index(&mut inner)?;
            let server = &mut inner.servers[index];
            server.adjust_load(1);
            metrics::record_load(&server.id, server.load);
            server.clone()
        };
        Some(DispatchGuard::new(Arc::clone(self), server))
    }

    fn select_index(&self, inner: &mut Inner) -> Option<usize> {
        let chosen = {
            let healthy: Vec<&ServerState> =
                inner.servers.iter().filter(|s| s.is_healthy()).collect();
            self.strategy
                .select(&healthy)
                .and_then(|chosen| inner.servers.iter().position(|s| std::ptr::eq(s, chosen)))
        };

        let Some(index) = chosen else {
            tracing::warn!(
                strategy = self.strategy.name(),
                healthy = inner.healthy_count(),
                total = inner.servers.len(),
                "No healthy server available"
            );
            metrics::record_selection_failure();
            return None;
        };

        let id = inner.servers[index].id.clone();

        if inner.last_selected.as_deref().is_some_and(|last| last != id) {
            inner.counters.switches += 1;
        }
        inner.last_selected = Some(id);

        Some(index)
    }

    // --- Recording ---

    /// Record a completed request against `id`.
    pub fn record_request(&self, id: &str, duration_ms: f64, success: bool) {
        let threshold = self.config.unhealthy_threshold;
        let mut inner = self.lock();

        let Some(server) = inner.server_mut(id) else {
            tracing::debug!(server = %id, "Ignoring outcome for unknown server");
            return;
        };
        let transition = server.record_outcome(duration_ms, success, threshold);

        inner.counters.total += 1;
        if success {
            inner.counters.successful += 1;
        } else {
            inner.counters.failed += 1;
        }
        drop(inner);

        metrics::record_request(id, success, duration_ms);
        if let Some(t) = transition {
            log_transition(id, t, "request failures");
        }
    }

    /// Add `delta` to the in-flight load of `id`, never going below zero.
    pub fn update_load(&self, id: &str, delta: i64) {
        let mut inner = self.lock();
        match inner.server_mut(id) {
            Some(server) => {
                let load = server.adjust_load(delta);
                metrics::record_load(id, load);
            }
            None => tracing::debug!(server = %id, delta, "Ignoring load update for unknown server"),
        }
    }

    // --- Health ---

    /// Probe every registered server once, healthy or not, one at a time.
    pub async fn check_health(&self) {
        let (probe, servers) = self.probe_targets();
        for server in servers {
            let result = probe.probe(&server).await;
            self.apply_probe_result(&server, result);
        }
    }

    /// The probe and a snapshot of every server, for one health tick.
    pub(crate) fn probe_targets(&self) -> (Arc<dyn HealthProbe>, Vec<ServerState>) {
        (Arc::clone(&self.probe), self.lock().servers.clone())
    }

    pub(crate) fn apply_probe_result(&self, server: &ServerState, result: Result<bool, ProbeError>) {
        let ok = match result {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(server = %server.id, url = %server.url, "Health probe failed");
                false
            }
            Err(e) => {
                tracing::warn!(server = %server.id, url = %server.url, error = %e, "Health probe error");
                false
            }
        };
        self.apply_probe(&server.id, ok);
    }

    fn apply_probe(&self, id: &str, ok: bool) {
        let threshold = self.config.unhealthy_threshold;
        let transition = {
            let mut inner = self.lock();
            // Deregistered while its probe was in flight.
            let Some(server) = inner.server_mut(id) else {
                return;
            };
            let transition = server.record_probe(ok, threshold);
            metrics::record_server_health(id, server.is_healthy());
            transition
        };

        if let Some(t) = transition {
            log_transition(id, t, if ok { "probe succeeded" } else { "probe failures" });
        }
    }

    /// Spawn the periodic health-check loop on the current Tokio runtime.
    /// Returns `false` if it is already running.
    pub fn start_health_checks(self: &Arc<Self>) -> bool {
        let mut slot = self.health_loop.lock().expect("health loop mutex poisoned");
        if slot.is_some() {
            return false;
        }

        let shutdown = Shutdown::new();
        let interval = Duration::from_millis(self.config.health_check_interval_ms.max(1));
        let monitor = HealthMonitor::new(Arc::downgrade(self), interval);
        tokio::spawn(monitor.run(shutdown.subscribe()));

        *slot = Some(shutdown);
        true
    }

    /// Release the health-check loop. Idempotent.
    pub fn stop(&self) {
        // Runs from Drop; a poisoned slot must not turn into a double panic.
        let shutdown = self
            .health_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(shutdown) = shutdown {
            shutdown.trigger();
            tracing::info!("Health checks stopped");
        }
    }

    pub fn is_checking_health(&self) -> bool {
        self.health_loop.lock().expect("health loop mutex poisoned").is_some()
    }

    // --- Membership ---

    /// Add a server at runtime. Returns `false` if the id is already taken.
    /// A missing id defaults to the lowest index at or above the current
    /// number of servers that no server uses as its id.
    pub fn register(&self, config: ServerConfig) -> bool {
        let mut inner = self.lock();
        let mut index = inner.servers.len();
        while inner.servers.iter().any(|s| s.id == index.to_string()) {
            index += 1;
        }
        let server = ServerState::from_config(index, &config);
        if inner.servers.iter().any(|s| s.id == server.id) {
            tracing::warn!(server = %server.id, "Refusing to register duplicate server id");
            return false;
        }

        tracing::info!(server = %server.id, url = %server.url, weight = server.weight, "Server registered");
        metrics::record_server_health(&server.id, true);
        inner.servers.push(server);
        self.strategy.membership_changed(inner.healthy_count());
        true
    }

    /// Remove a server. Returns `false` for an unknown id.
    pub fn deregister(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let Some(index) = inner.servers.iter().position(|s| s.id == id) else {
            return false;
        };

        inner.servers.remove(index);
        if inner.last_selected.as_deref() == Some(id) {
            inner.last_selected = None;
        }
        self.strategy.membership_changed(inner.healthy_count());
        tracing::info!(server = %id, "Server deregistered");
        true
    }

    // --- Stats ---

    /// Snapshot of one server.
    pub fn server(&self, id: &str) -> Option<ServerState> {
        self.lock().servers.iter().find(|s| s.id == id).cloned()
    }

    pub fn server_stats(&self) -> Vec<ServerStats> {
        self.lock().servers.iter().map(ServerState::stats).collect()
    }

    pub fn stats(&self) -> BalancerStats {
        let inner = self.lock();
        let c = inner.counters;
        BalancerStats {
            total_requests: c.total,
            successful_requests: c.successful,
            failed_requests: c.failed,
            success_rate: if c.total == 0 {
                0.0
            } else {
                c.successful as f64 / c.total as f64
            },
            server_switches: c.switches,
            strategy: self.strategy.name().to_string(),
            healthy_servers: inner.healthy_count(),
            total_servers: inner.servers.len(),
        }
    }

    /// Zero the aggregate counters. Per-server state is untouched.
    pub fn reset_stats(&self) {
        let mut inner = self.lock();
        inner.counters = RequestCounters::default();
        inner.last_selected = None;
    }
}

impl Drop for LoadBalancer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn log_transition(id: &str, t: HealthTransition, cause: &str) {
    metrics::record_transition(id, t.to);
    if t.to.is_healthy() {
        tracing::info!(server = %id, from = t.from.as_str(), to = t.to.as_str(), cause, "Server recovered");
    } else {
        tracing::warn!(
            server = %id,
            from = t.from.as_str(),
            to = t.to.as_str(),
            error_count = t.error_count,
            cause,
            "Server marked unhealthy"
        );
    }
}
