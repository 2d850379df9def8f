//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → balancer.rs (filter healthy servers)
//!     → Apply selection strategy:
//!         - round_robin.rs (rotate with a shared cursor)
//!         - least_conn.rs (lowest in-flight load)
//!         - weighted.rs (random draw proportional to weight)
//!         - response_time.rs (lowest smoothed latency)
//!         - first_available.rs (unrecognised strategy name)
//!     → guard.rs (load +1, outcome + load -1 on drop)
//!     → server.rs (counters, EMA, health transitions)
//! ```
//!
//! # Design Decisions
//! - Strategies are pure reads over the healthy subset
//! - All writes go through record_request, update_load and the health loop
//! - "No healthy server" is a normal `None`, not an error

pub mod balancer;
pub mod first_available;
pub mod guard;
pub mod least_conn;
pub mod response_time;
pub mod round_robin;
pub mod server;
pub mod strategy;
pub mod weighted;

pub use balancer::{BalancerStats, LoadBalancer};
pub use guard::DispatchGuard;
pub use server::{ServerState, ServerStats, EMA_ALPHA};
pub use strategy::{build_strategy, SelectionStrategy, StrategyKind};
