//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout, request ID, tracing)
//!     → adapter.rs (select server, load +1, 503 if none)
//!     → server.rs forward_handler (send to chosen server)
//!     → adapter.rs (X-Served-By / X-Server-Load, wrap body)
//!     → body.rs (record outcome, load -1 once the body is sent)
//!     → Send to client
//! ```

pub mod adapter;
pub mod body;
pub mod request;
pub mod response;
pub mod server;

pub use adapter::{balance_middleware, SelectedServer, X_SERVED_BY, X_SERVER_LOAD};
pub use body::TrackedBody;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
