//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all proxy handler)
//!     → request.rs (request ID stamping)
//!     → [route table resolves the upstream]
//!     → [policy layer enforces rate limit / CORS]
//!     → response.rs (error envelopes, rate-limit headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::GatewayServer;
