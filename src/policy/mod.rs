//! Per-route policy enforcement.
//!
//! # Data Flow
//! ```text
//! Matched Route (from routing engine)
//!     → rate_limit.rs (count against the client's window, 429 on excess)
//!     → cors.rs (answer preflights, decorate responses)
//!     → headers.rs (hop-by-hop stripping, X-Forwarded-*, Host rewrite)
//!     → Forwarded request / decorated response
//! ```
//!
//! # Design Decisions
//! - Policy objects are compiled once with the route table and shared
//!   read-only; only rate-limit counters mutate, behind a sharded map
//! - Enforcement happens in the proxy handler after route resolution,
//!   because every policy here is route-scoped

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::CorsPolicy;
pub use rate_limit::{RateDecision, RateLimiter};
