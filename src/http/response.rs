//! Response helpers.
//!
//! # Responsibilities
//! - Build the 503 body returned when selection fails
//! - Map upstream errors to gateway status codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// 503 with a machine-readable body.
pub fn no_available_servers() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "no available servers",
            "message": "All backend servers are currently unhealthy",
        })),
    )
        .into_response()
}

/// 502 for an upstream that could not be reached or answered garbage.
pub fn bad_gateway(reason: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "error": "upstream request failed",
            "message": reason,
        })),
    )
        .into_response()
}
