//! Balancer introspection endpoints.
//!
//! These routes are served by the host directly and never pass through the
//! request adapter.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use self::handlers::*;
use crate::load_balancer::LoadBalancer;

pub const STATS_PATH: &str = "/_balancer/stats";
pub const SERVERS_PATH: &str = "/_balancer/servers";
pub const RESET_PATH: &str = "/_balancer/reset";

pub fn setup_admin_router(balancer: Arc<LoadBalancer>) -> Router {
    Router::new()
        .route(STATS_PATH, get(get_stats))
        .route(SERVERS_PATH, get(get_servers))
        .route(RESET_PATH, post(reset_stats))
        .with_state(balancer)
}
