//! Route table and request resolution.
//!
//! # Responsibilities
//! - Compile the declarative config into an immutable route table
//! - Resolve each request to exactly one route, or an explicit error
//! - Produce the forwarding decision (upstream, rewritten path, policy)
//!
//! # Design Decisions
//! - Routes compiled and sorted by descending priority at startup,
//!   immutable afterwards (shared via `Arc`, no locks)
//! - First match wins; a second match at the same priority is reported as
//!   `Ambiguous` rather than silently resolved, since the loader should
//!   have rejected the configuration
//! - Matching is path + header based; the method plays no part

use http::uri::{Authority, Scheme, Uri};
use http::HeaderMap;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, RouteConfig, ServiceConfig};
use crate::policy::cors::CorsPolicy;
use crate::policy::rate_limit::RateLimiter;
use crate::routing::matcher::{strip_matched_prefix, PathPattern, PatternError};

/// Error raised while compiling the route table from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("service {service}: invalid upstream url {url:?}")]
    InvalidUpstream { service: String, url: String },

    #[error("route {route}: {source}")]
    InvalidPattern {
        route: String,
        #[source]
        source: PatternError,
    },
}

/// Request-time resolution failure.
#[derive(Debug, Error)]
pub enum RouteError {
    /// No route matched the request path and headers. Maps to 404.
    #[error("no route matches the request")]
    NoRoute,

    /// Two routes at the same priority both matched. The loader rejects
    /// this statically, so hitting it at request time is a configuration
    /// bug and maps to 500 instead of silently picking a winner.
    #[error("routes {first:?} and {second:?} both match at priority {priority}")]
    Ambiguous {
        first: String,
        second: String,
        priority: i32,
    },
}

/// An upstream service address, parsed once at build time.
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Service identifier for logging/metrics.
    pub name: String,
    pub scheme: Scheme,
    pub authority: Authority,
}

impl Upstream {
    fn from_service(service: &ServiceConfig) -> Result<Self, BuildError> {
        let invalid = || BuildError::InvalidUpstream {
            service: service.name.clone(),
            url: service.url.clone(),
        };
        let uri: Uri = service.url.parse().map_err(|_| invalid())?;
        let scheme = uri.scheme().cloned().ok_or_else(invalid)?;
        let authority = uri.authority().cloned().ok_or_else(invalid)?;
        Ok(Self {
            name: service.name.clone(),
            scheme,
            authority,
        })
    }
}

/// Policy attached to a route, enforced by the proxy handler.
#[derive(Default)]
pub struct RoutePolicy {
    pub cors: Option<CorsPolicy>,
    pub rate_limit: Option<RateLimiter>,
}

/// A compiled routing rule bound to one upstream.
pub struct Route {
    pub name: String,
    patterns: Vec<PathPattern>,
    pub strip_path: bool,
    pub preserve_host: bool,
    pub regex_priority: i32,
    /// Header constraints with names lowercased at build time.
    required_headers: Vec<(String, String)>,
    pub policy: RoutePolicy,
    upstream: usize,
}

impl Route {
    fn from_config(config: &RouteConfig, upstream: usize) -> Result<Self, BuildError> {
        let patterns = config
            .paths
            .iter()
            .map(|raw| {
                PathPattern::compile(raw).map_err(|source| BuildError::InvalidPattern {
                    route: config.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let required_headers = config
            .headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.clone()))
            .collect();

        let policy = RoutePolicy {
            cors: config.plugins.cors.as_ref().map(CorsPolicy::from_config),
            rate_limit: config
                .plugins
                .rate_limit
                .as_ref()
                .map(RateLimiter::from_config),
        };

        Ok(Self {
            name: config.name.clone(),
            patterns,
            strip_path: config.strip_path,
            preserve_host: config.preserve_host,
            regex_priority: config.regex_priority,
            required_headers,
            policy,
            upstream,
        })
    }

    /// Match against path and headers. Returns the longest matched prefix
    /// length among this route's patterns, or None.
    fn matches(&self, path: &str, headers: &HeaderMap) -> Option<usize> {
        if !self.headers_satisfied(headers) {
            return None;
        }
        self.patterns.iter().filter_map(|p| p.matches(path)).max()
    }

    fn headers_satisfied(&self, headers: &HeaderMap) -> bool {
        self.required_headers.iter().all(|(name, want)| {
            headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(|got| got == want)
                .unwrap_or(false)
        })
    }
}

/// The forwarding decision for a resolved request.
pub struct ForwardDecision<'a> {
    pub route: &'a Route,
    pub upstream: &'a Upstream,
    /// Path to forward: the original path, with the matched prefix removed
    /// when the route has `strip_path`.
    pub path: String,
}

/// Immutable, priority-ordered route table.
///
/// Built once at startup from validated configuration; `resolve` is a pure
/// function over it, safe for unbounded concurrent use.
pub struct RouteTable {
    routes: Vec<Route>,
    upstreams: Vec<Upstream>,
}

impl RouteTable {
    /// Compile the route table from configuration. Runs after semantic
    /// validation, so failures here indicate the config bypassed the
    /// loader.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, BuildError> {
        let mut upstreams = Vec::with_capacity(config.services.len());
        let mut routes = Vec::new();

        for service in &config.services {
            let upstream_idx = upstreams.len();
            upstreams.push(Upstream::from_service(service)?);
            for route in &service.routes {
                routes.push(Route::from_config(route, upstream_idx)?);
            }
        }

        // Stable sort: equal priorities keep config order, though the
        // validator guarantees equal-priority routes never overlap.
        routes.sort_by(|a, b| b.regex_priority.cmp(&a.regex_priority));

        Ok(Self { routes, upstreams })
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn upstreams(&self) -> &[Upstream] {
        &self.upstreams
    }

    /// Resolve a request to its unique forwarding decision.
    pub fn resolve(
        &self,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<ForwardDecision<'_>, RouteError> {
        let mut winner: Option<(usize, usize)> = None;

        for (idx, route) in self.routes.iter().enumerate() {
            if let Some((widx, _)) = winner {
                // Routes are sorted descending; once priority drops below
                // the winner's, no tie is possible.
                if route.regex_priority < self.routes[widx].regex_priority {
                    break;
                }
            }
            if let Some(matched_len) = route.matches(path, headers) {
                match winner {
                    None => winner = Some((idx, matched_len)),
                    Some((widx, _)) => {
                        return Err(RouteError::Ambiguous {
                            first: self.routes[widx].name.clone(),
                            second: route.name.clone(),
                            priority: route.regex_priority,
                        });
                    }
                }
            }
        }

        let (idx, matched_len) = winner.ok_or(RouteError::NoRoute)?;
        let route = &self.routes[idx];
        let path = if route.strip_path {
            strip_matched_prefix(path, matched_len)
        } else {
            path.to_string()
        };

        Ok(ForwardDecision {
            route,
            upstream: &self.upstreams[route.upstream],
            path,
        })
    }
}
