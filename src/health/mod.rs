//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (monitor.rs):
//!     Periodic timer
//!     → probe.rs (HealthProbe per server, sequential)
//!     → ServerState::record_probe
//!
//! Passive health checks (LoadBalancer::record_request):
//!     Request failure observed
//!     → Increment error count
//!     → Demote immediately if threshold reached
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     Demotion by traffic or probes, promotion by probes only
//! ```
//!
//! # Design Decisions
//! - Probe failures and request failures share one error counter
//! - Health state is per-server
//! - A failing probe never aborts the tick for other servers

pub mod monitor;
pub mod probe;
pub mod state;

pub use probe::{AlwaysHealthy, HealthProbe, HttpProbe, ProbeError};
pub use state::{HealthState, HealthTransition};
