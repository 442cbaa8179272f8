//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! declarative config file (YAML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into the route table once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All sections have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Any load-time defect refuses startup rather than serving a
//!   partially-valid route table

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::RouteConfig;
pub use schema::ServiceConfig;
