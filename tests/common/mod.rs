//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use adaptive_lb::config::{BalancerConfig, ServerConfig};
use adaptive_lb::health::{HealthProbe, ProbeError};
use adaptive_lb::load_balancer::ServerState;
use adaptive_lb::LoadBalancer;

/// Start a mock backend on an ephemeral port that returns a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, response.to_string()) }).await
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that sends the headers and `first`, waits `pause`, then
/// sends `second`. The body has a fixed content length.
pub async fn start_streaming_backend(
    first: &'static str,
    pause: Duration,
    second: &'static str,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    first.len() + second.len(),
                    first
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(pause).await;
                let _ = socket.write_all(second.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address with nothing listening on it.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Servers named by id with placeholder URLs.
pub fn named_servers(ids: &[&str]) -> Vec<ServerConfig> {
    ids.iter()
        .map(|id| ServerConfig::new(format!("http://{id}.internal")).with_id(*id))
        .collect()
}

pub fn balancer(strategy: &str, unhealthy_threshold: u32, ids: &[&str]) -> LoadBalancer {
    let config = BalancerConfig {
        strategy: strategy.into(),
        unhealthy_threshold,
        ..BalancerConfig::default()
    };
    LoadBalancer::new(config, &named_servers(ids))
}

/// Probe whose verdict per server id can be changed from the test.
/// Servers not listed as down are healthy. Every call is logged.
#[derive(Clone, Default)]
pub struct ScriptedProbe {
    down: Arc<Mutex<HashSet<String>>>,
    erroring: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProbe {
    pub fn set_down(&self, id: &str, down: bool) {
        let mut set = self.down.lock().unwrap();
        if down {
            set.insert(id.to_string());
        } else {
            set.remove(id);
        }
    }

    pub fn set_erroring(&self, id: &str) {
        self.erroring.lock().unwrap().insert(id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(&self, server: &ServerState) -> Result<bool, ProbeError> {
        self.calls.lock().unwrap().push(server.id.clone());
        if self.erroring.lock().unwrap().contains(&server.id) {
            return Err(ProbeError::Connect("scripted failure".into()));
        }
        Ok(!self.down.lock().unwrap().contains(&server.id))
    }
}

/// Probe that never answers. Records when a call starts and when its
/// pending future is dropped.
#[derive(Clone, Default)]
pub struct StuckProbe {
    pub started: Arc<AtomicBool>,
    pub cancelled: Arc<AtomicBool>,
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthProbe for StuckProbe {
    async fn probe(&self, _server: &ServerState) -> Result<bool, ProbeError> {
        self.started.store(true, Ordering::SeqCst);
        let _cancelled = SetOnDrop(self.cancelled.clone());
        std::future::pending::<Result<bool, ProbeError>>().await
    }
}
