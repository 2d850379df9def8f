//! Request adapter middleware.
//!
//! # Responsibilities
//! - Select a server for every request passing through
//! - Reject with 503 when no server is healthy
//! - Expose the chosen server to inner handlers
//! - Report the outcome and release the load once the response body is done
//! - Add `X-Served-By` / `X-Server-Load` response headers
//!
//! # Design Decisions
//! - 5xx responses count as failures; 4xx are the client's fault
//! - A cancelled or timed-out request counts as a failure (guard drop)
//! - The guard rides in the response body, so load and latency cover the
//!   whole transfer, not just the time to the first byte

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::http::body::TrackedBody;
use crate::http::response::no_available_servers;
use crate::load_balancer::LoadBalancer;

pub const X_SERVED_BY: &str = "x-served-by";
pub const X_SERVER_LOAD: &str = "x-server-load";

/// The server chosen for the current request.
/// Inserted into request extensions before the inner handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedServer {
    pub id: String,
    pub url: String,
    /// Load on the server right after this request was counted.
    pub load: u64,
}

/// Middleware wrapping one request in a balancer dispatch.
pub async fn balance_middleware(
    State(balancer): State<Arc<LoadBalancer>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(guard) = balancer.dispatch() else {
        tracing::warn!(path = %request.uri().path(), "Rejecting request: no available servers");
        return no_available_servers();
    };

    let selected = SelectedServer {
        id: guard.id.clone(),
        url: guard.url.clone(),
        load: guard.load_at_dispatch(),
    };
    tracing::debug!(server = %selected.id, load = selected.load, "Dispatching request");
    request.extensions_mut().insert(selected.clone());

    let response = next.run(request).await;

    let success = !response.status().is_server_error();
    let mut response = response.map(|body| Body::new(TrackedBody::new(body, guard, success)));

    let headers = response.headers_mut();
    match HeaderValue::from_str(&selected.id) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(X_SERVED_BY), value);
        }
        Err(_) => tracing::debug!(server = %selected.id, "Server id is not a valid header value"),
    }
    headers.insert(HeaderName::from_static(X_SERVER_LOAD), HeaderValue::from(selected.load));

    response
}
