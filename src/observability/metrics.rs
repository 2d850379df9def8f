//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define balancer metrics (requests, latency, load, health)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-server and aggregate metrics
//!
//! # Metrics
//! - `lb_requests_total` (counter): completed requests by server, outcome
//! - `lb_request_duration_ms` (histogram): recorded request duration
//! - `lb_server_load` (gauge): in-flight requests per server
//! - `lb_server_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `lb_health_transitions_total` (counter): state changes by server, target state
//! - `lb_selection_failures_total` (counter): selections with no healthy server
//!
//! # Design Decisions
//! - Calls are no-ops until a recorder is installed
//! - Labels for server id and outcome only

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::state::HealthState;

/// Install the Prometheus recorder and its scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(server: &str, success: bool, duration_ms: f64) {
    let outcome = if success { "success" } else { "failure" };
    counter!("lb_requests_total", "server" => server.to_string(), "outcome" => outcome).increment(1);
    histogram!("lb_request_duration_ms", "server" => server.to_string()).record(duration_ms);
}

pub fn record_load(server: &str, load: u64) {
    gauge!("lb_server_load", "server" => server.to_string()).set(load as f64);
}

pub fn record_server_health(server: &str, healthy: bool) {
    gauge!("lb_server_healthy", "server" => server.to_string()).set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_transition(server: &str, to: HealthState) {
    counter!("lb_health_transitions_total", "server" => server.to_string(), "to" => to.as_str())
        .increment(1);
    record_server_health(server, to.is_healthy());
}

pub fn record_selection_failure() {
    counter!("lb_selection_failures_total").increment(1);
}
