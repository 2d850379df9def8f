//! Health probes.
//!
//! # Responsibilities
//! - Define the pluggable probe contract used by the health-check loop
//! - Provide the default (always healthy) and HTTP implementations

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use tokio::time;

use crate::config::{HealthCheckConfig, ProbeKind};
use crate::load_balancer::server::ServerState;

/// Why a probe could not produce a verdict.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to build probe request: {0}")]
    Request(String),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Decides whether a server should receive traffic.
///
/// `Ok(false)` and `Err(_)` are treated the same by the health-check loop;
/// the error only carries detail for the logs.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, server: &ServerState) -> Result<bool, ProbeError>;
}

/// Reports every server healthy. Used until a real check is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysHealthy;

#[async_trait]
impl HealthProbe for AlwaysHealthy {
    async fn probe(&self, _server: &ServerState) -> Result<bool, ProbeError> {
        Ok(true)
    }
}

/// `GET <server url><path>`; healthy on any 2xx status.
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            path: path.into(),
            timeout,
        }
    }

    fn target(&self, server: &ServerState) -> String {
        let base = server.url.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, server: &ServerState) -> Result<bool, ProbeError> {
        let request = Request::builder()
            .method("GET")
            .uri(self.target(server))
            .header("user-agent", "adaptive-lb-health-check")
            .body(Body::empty())
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::debug!(server = %server.id, status = %response.status(), "Probe got non-success status");
                }
                Ok(success)
            }
            Ok(Err(e)) => Err(ProbeError::Connect(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }
}

/// Build the probe selected by configuration.
pub fn probe_from_config(config: &HealthCheckConfig) -> Box<dyn HealthProbe> {
    match config.kind {
        ProbeKind::Http => Box::new(HttpProbe::new(
            config.path.clone(),
            Duration::from_millis(config.timeout_ms),
        )),
        ProbeKind::None => Box::new(AlwaysHealthy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn one_shot_backend(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_always_healthy() {
        let server = ServerState::new("a", "http://a", 1);
        assert!(AlwaysHealthy.probe(&server).await.unwrap());
    }

    #[test]
    fn test_target_joins_path() {
        let probe = HttpProbe::new("health", Duration::from_secs(1));
        let server = ServerState::new("a", "http://127.0.0.1:3000/", 1);
        assert_eq!(probe.target(&server), "http://127.0.0.1:3000/health");
    }

    #[tokio::test]
    async fn test_http_probe_success() {
        let url = one_shot_backend("200 OK").await;
        let probe = HttpProbe::new("/health", Duration::from_secs(2));
        let server = ServerState::new("a", url, 1);
        assert!(probe.probe(&server).await.unwrap());
    }

    #[tokio::test]
    async fn test_http_probe_server_error() {
        let url = one_shot_backend("503 Service Unavailable").await;
        let probe = HttpProbe::new("/health", Duration::from_secs(2));
        let server = ServerState::new("a", url, 1);
        assert!(!probe.probe(&server).await.unwrap());
    }

    #[tokio::test]
    async fn test_http_probe_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HttpProbe::new("/health", Duration::from_secs(2));
        let server = ServerState::new("a", format!("http://{}", addr), 1);
        assert!(matches!(probe.probe(&server).await, Err(ProbeError::Connect(_))));
    }
}
