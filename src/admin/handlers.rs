use axum::{extract::State, Json};
use std::sync::Arc;

use crate::load_balancer::{BalancerStats, LoadBalancer, ServerStats};

pub async fn get_stats(State(balancer): State<Arc<LoadBalancer>>) -> Json<BalancerStats> {
    Json(balancer.stats())
}

pub async fn get_servers(State(balancer): State<Arc<LoadBalancer>>) -> Json<Vec<ServerStats>> {
    Json(balancer.server_stats())
}

/// Zero the aggregate counters and return the fresh stats.
pub async fn reset_stats(State(balancer): State<Arc<LoadBalancer>>) -> Json<BalancerStats> {
    balancer.reset_stats();
    tracing::info!("Aggregate stats reset");
    Json(balancer.stats())
}
