//! adaptive-lb host process.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────────────────────────────────────────┐
//!     ────────────────────┼─▶ http server ─▶ request adapter ─▶ forward ─┼──▶ Backend
//!                         │                       │    ▲                 │
//!                         │            select /   │    │ record outcome  │
//!                         │            load +1    ▼    │ load -1         │
//!                         │                ┌──────────────┐              │
//!                         │                │ LoadBalancer │◀── health    │
//!                         │                │  + strategy  │    monitor ──┼──▶ probes
//!                         │                └──────────────┘              │
//!                         └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use adaptive_lb::config::{load_config, ProxyConfig};
use adaptive_lb::health::probe::probe_from_config;
use adaptive_lb::lifecycle::{signals, Shutdown};
use adaptive_lb::observability::{logging, metrics};
use adaptive_lb::{HttpServer, LoadBalancer};

#[derive(Parser)]
#[command(name = "adaptive-lb")]
#[command(about = "Health-aware load balancing reverse proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("adaptive-lb v{} starting", env!("CARGO_PKG_VERSION"));

    if config.servers.is_empty() {
        tracing::warn!("No servers configured; every request will receive 503");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        strategy = %config.balancer.strategy,
        servers = config.servers.len(),
        health_check_interval_ms = config.balancer.health_check_interval_ms,
        unhealthy_threshold = config.balancer.unhealthy_threshold,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let probe = Arc::from(probe_from_config(&config.health_check));
    let balancer = Arc::new(
        LoadBalancer::new(config.balancer.clone(), &config.servers).with_shared_probe(probe),
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config, balancer);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
