//! Configuration schema definitions.
//!
//! This module defines the complete declarative configuration for the
//! gateway: a list of upstream services, each carrying the routes that
//! forward to it, plus listener/timeout/observability sections.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Upstream service definitions, each with its route set.
    pub services: Vec<ServiceConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// An upstream service and the routes that forward to it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service identifier for logging/metrics.
    pub name: String,

    /// Upstream base address (e.g., "http://tasks:8002").
    pub url: String,

    /// Routes bound to this service.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// A routing rule mapping path patterns (and optional header constraints)
/// to the enclosing service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Unique route identifier.
    pub name: String,

    /// Path patterns. A pattern containing a group (`(`) is treated as a
    /// regex anchored at the start of the path; anything else matches as a
    /// literal prefix.
    pub paths: Vec<String>,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_path: bool,

    /// Forward the client's Host header unchanged instead of substituting
    /// the upstream authority.
    #[serde(default)]
    pub preserve_host: bool,

    /// Precedence when multiple routes match the same request (higher
    /// wins). Equal priorities on overlapping paths are rejected at load
    /// time.
    #[serde(default)]
    pub regex_priority: i32,

    /// Required header constraints: the route only matches when every
    /// listed header is present with exactly the listed value (header
    /// names compared case-insensitively).
    ///
    /// This is the platform's internal/external trust boundary: internal
    /// routes require a sentinel header set by trusted callers. Anyone
    /// able to forge the header gains internal access; deploy behind
    /// network isolation if that matters.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Per-route policy (CORS, rate limiting).
    #[serde(default)]
    pub plugins: PluginConfig,
}

/// Optional policy blocks attached to a route.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PluginConfig {
    pub cors: Option<CorsConfig>,
    pub rate_limit: Option<RateLimitConfig>,
}

/// CORS policy for a route.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. `"*"` allows any origin.
    pub origins: Vec<String>,

    /// Allowed methods for preflight responses.
    pub methods: Vec<String>,

    /// Allowed request headers for preflight responses.
    pub headers: Vec<String>,

    /// Response headers exposed to the browser.
    pub exposed_headers: Vec<String>,

    /// Allow credentialed requests.
    pub credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,

    /// Pass OPTIONS preflights through to the upstream instead of
    /// answering them at the gateway.
    pub preflight_continue: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: vec!["*".to_string()],
            methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "PATCH".to_string(),
                "DELETE".to_string(),
                "OPTIONS".to_string(),
            ],
            headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            exposed_headers: Vec::new(),
            credentials: false,
            max_age_secs: 3600,
            preflight_continue: false,
        }
    }
}

/// Rate-limit policy for a route.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per 60-second window.
    pub minute: u32,

    /// Counter scope. `local` keeps state per gateway process; replicas
    /// do not share counters.
    pub policy: RateLimitScope,

    /// What identifies a client for counting purposes.
    pub limit_by: RateLimitKey,

    /// Header to key by when `limit_by: header`. Requests without the
    /// header share an "anonymous" bucket.
    pub header_name: Option<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            minute: 60,
            policy: RateLimitScope::Local,
            limit_by: RateLimitKey::Ip,
            header_name: None,
        }
    }
}

/// Rate-limit counter scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitScope {
    Local,
}

/// Rate-limit client key source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitKey {
    Ip,
    Header,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
