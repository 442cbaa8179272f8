//! Declarative API gateway for the HotLabel labeling platform.
//!
//! Loads a declarative route configuration once at startup, compiles it
//! into an immutable priority-ordered route table, and forwards each
//! inbound request to exactly one upstream service with per-route policy
//! (CORS, rate limiting) enforced.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod policy;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use routing::RouteTable;
