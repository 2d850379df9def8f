//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler and admin endpoints
//! - Wire up middleware (tracing, timeout, request ID, request adapter)
//! - Forward requests to the server chosen by the balancer
//! - Own the balancer's health-check loop for the server's lifetime

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderName, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Extension, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::ProxyConfig;
use crate::http::adapter::{balance_middleware, SelectedServer};
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::http::response::bad_gateway;
use crate::load_balancer::LoadBalancer;

/// Application state injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
}

/// Reverse proxy fronted by the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    balancer: Arc<LoadBalancer>,
}

impl HttpServer {
    /// Create a new HTTP server around an existing balancer.
    pub fn new(config: ProxyConfig, balancer: Arc<LoadBalancer>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { client };

        let router = Self::build_router(&config, state, balancer.clone());
        Self {
            router,
            config,
            balancer,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, balancer: Arc<LoadBalancer>) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        let proxy = Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .layer(middleware::from_fn_with_state(balancer.clone(), balance_middleware))
            .with_state(state);

        proxy
            .merge(setup_admin_router(balancer))
            .layer(TimeoutLayer::new(Duration::from_millis(config.listener.request_timeout_ms)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
    }

    /// The router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn balancer(&self) -> &Arc<LoadBalancer> {
        &self.balancer
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then stop health checks.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            strategy = self.balancer.strategy_name(),
            "HTTP server starting"
        );

        if self.config.health_check.enabled {
            self.balancer.start_health_checks();
        } else {
            tracing::info!("Active health checks disabled");
        }

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await;

        self.balancer.stop();
        tracing::info!("HTTP server stopped");
        result
    }
}

/// Forward the request to the server the adapter selected.
async fn forward_handler(
    State(state): State<AppState>,
    Extension(selected): Extension<SelectedServer>,
    request: Request,
) -> Response {
    let request_id = request_id(&request);
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("{}{}", selected.url.trim_end_matches('/'), path_and_query);

    let uri = match target.parse::<Uri>() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, server = %selected.id, target = %target, error = %e, "Invalid upstream URI");
            return bad_gateway("invalid upstream address");
        }
    };

    tracing::debug!(request_id = %request_id, server = %selected.id, uri = %uri, "Forwarding request");

    parts.uri = uri;
    // Let the client derive Host from the upstream URI.
    parts.headers.remove(header::HOST);

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body)).into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, server = %selected.id, error = %e, "Upstream error");
            bad_gateway("upstream request failed")
        }
    }
}
