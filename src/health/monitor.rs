//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered server, healthy or not
//! - Feed results into the per-server state machine
//!
//! Probes within a tick run one after another, so a slow probe delays the
//! servers behind it. Probe timeouts belong to the probe implementation;
//! shutdown and dropping the balancer cancel a pending probe.

use std::sync::Weak;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::load_balancer::balancer::LoadBalancer;

pub struct HealthMonitor {
    balancer: Weak<LoadBalancer>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(balancer: Weak<LoadBalancer>, interval: Duration) -> Self {
        Self { balancer, interval }
    }

    /// Tick until shutdown is signalled or the balancer is dropped.
    /// The first tick fires one full interval after start.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // A hung probe must not keep the loop alive past shutdown.
                    tokio::select! {
                        alive = self.tick() => {
                            if !alive {
                                tracing::debug!("Load balancer dropped, health monitor exiting");
                                break;
                            }
                        }
                        _ = shutdown.recv() => {
                            tracing::info!("Health monitor received shutdown signal mid-tick, exiting loop");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One pass over every server. The balancer is only upgraded between
    /// probes, never held while one is pending. Returns `false` once the
    /// balancer is gone.
    async fn tick(&self) -> bool {
        let Some((probe, servers)) = self.balancer.upgrade().map(|b| b.probe_targets()) else {
            return false;
        };

        for server in servers {
            let result = probe.probe(&server).await;
            let Some(balancer) = self.balancer.upgrade() else {
                return false;
            };
            balancer.apply_probe_result(&server, result);
        }
        true
    }
}
