//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Unique service and route names
//! - Upstream URLs parse as http:// with an authority; the forwarding
//!   client speaks plain HTTP, so https upstreams are rejected here
//!   instead of failing every request with a 502
//! - Path patterns compile
//! - Equal-priority routes must not overlap: priority is the only
//!   tie-break at request time, so it must be a strict total order within
//!   overlapping path scopes
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig -> Result<(), Vec<_>>
//! - Overlap between regex routes is approximated by their static
//!   prefixes; an undetected tie still fails loudly at request time

use std::collections::HashSet;

use http::Uri;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, RouteConfig};
use crate::routing::matcher::{static_prefix, PathPattern};

/// A single semantic defect in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("duplicate service name {0:?}")]
    DuplicateService(String),

    #[error("duplicate route name {0:?}")]
    DuplicateRoute(String),

    #[error(
        "service {service:?}: upstream url {url:?} must be http://host[:port] (TLS to upstreams is not supported)"
    )]
    InvalidUpstreamUrl { service: String, url: String },

    #[error("route {0:?}: at least one path pattern is required")]
    EmptyPaths(String),

    #[error("route {route:?}: {reason}")]
    InvalidPattern { route: String, reason: String },

    #[error(
        "routes {first:?} and {second:?} overlap on {prefix:?} with equal regex_priority {priority}"
    )]
    PriorityConflict {
        first: String,
        second: String,
        prefix: String,
        priority: i32,
    },

    #[error("route {0:?}: rate limit must allow at least one request per minute")]
    ZeroRateLimit(String),
}

/// Validate a parsed configuration, collecting every defect found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut service_names = HashSet::new();
    let mut route_names = HashSet::new();
    let mut routes: Vec<&RouteConfig> = Vec::new();

    for service in &config.services {
        if !service_names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        if !upstream_url_is_valid(&service.url) {
            errors.push(ValidationError::InvalidUpstreamUrl {
                service: service.name.clone(),
                url: service.url.clone(),
            });
        }

        for route in &service.routes {
            if !route_names.insert(route.name.as_str()) {
                errors.push(ValidationError::DuplicateRoute(route.name.clone()));
            }
            if route.paths.is_empty() {
                errors.push(ValidationError::EmptyPaths(route.name.clone()));
            }
            for raw in &route.paths {
                if let Err(e) = PathPattern::compile(raw) {
                    errors.push(ValidationError::InvalidPattern {
                        route: route.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            if let Some(limit) = &route.plugins.rate_limit {
                if limit.minute == 0 {
                    errors.push(ValidationError::ZeroRateLimit(route.name.clone()));
                }
            }
            routes.push(route);
        }
    }

    detect_priority_conflicts(&routes, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn upstream_url_is_valid(url: &str) -> bool {
    let Ok(uri) = url.parse::<Uri>() else {
        return false;
    };
    uri.scheme_str() == Some("http") && uri.authority().is_some()
}

/// Reject equal-priority route pairs that can match a common path, unless
/// their header constraints are mutually exclusive (same header required
/// with different values, so no single request satisfies both).
fn detect_priority_conflicts(routes: &[&RouteConfig], errors: &mut Vec<ValidationError>) {
    for (i, a) in routes.iter().enumerate() {
        for b in routes.iter().skip(i + 1) {
            if a.regex_priority != b.regex_priority {
                continue;
            }
            if constraints_conflict(a, b) {
                continue;
            }
            if let Some(prefix) = overlapping_prefix(a, b) {
                errors.push(ValidationError::PriorityConflict {
                    first: a.name.clone(),
                    second: b.name.clone(),
                    prefix,
                    priority: a.regex_priority,
                });
            }
        }
    }
}

/// Two routes conflict-free by construction when they require the same
/// header with different values.
fn constraints_conflict(a: &RouteConfig, b: &RouteConfig) -> bool {
    a.headers.iter().any(|(name, value)| {
        b.headers
            .iter()
            .any(|(other, other_value)| name.eq_ignore_ascii_case(other) && value != other_value)
    })
}

fn overlapping_prefix(a: &RouteConfig, b: &RouteConfig) -> Option<String> {
    for pa in &a.paths {
        for pb in &b.paths {
            let (sa, sb) = (static_prefix(pa), static_prefix(pb));
            if sa.starts_with(sb) || sb.starts_with(sa) {
                return Some(if sa.len() >= sb.len() { sb } else { sa }.to_string());
            }
        }
    }
    None
}
