//! Health-aware dynamic load balancer.
//!
//! Picks a backend server per request, tracks each server's load, latency
//! and error count, demotes failing servers immediately and lets a periodic
//! health probe bring them back.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use health::HealthProbe;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::LoadBalancer;
