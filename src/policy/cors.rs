//! Per-route CORS enforcement.
//!
//! # Responsibilities
//! - Answer OPTIONS preflights at the gateway (unless the route opts out)
//! - Decorate ordinary responses with Access-Control-* headers
//!
//! # Design Decisions
//! - Policy is route-scoped, so a global middleware layer does not fit;
//!   the proxy handler applies the matched route's policy
//! - Wildcard origin is never echoed together with credentials; the
//!   request origin is reflected instead
//! - Disallowed origins get no CORS headers (the browser blocks)

use axum::body::Body;
use axum::response::Response;
use http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ACCESS_CONTROL_MAX_AGE, VARY,
};
use http::StatusCode;

use crate::config::schema::CorsConfig;

/// Compiled CORS policy for one route.
pub struct CorsPolicy {
    allow_any_origin: bool,
    origins: Vec<String>,
    allow_methods: String,
    allow_headers: String,
    expose_headers: Option<String>,
    credentials: bool,
    max_age_secs: u64,
    pub preflight_continue: bool,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            allow_any_origin: config.origins.iter().any(|o| o == "*"),
            origins: config.origins.clone(),
            allow_methods: config.methods.join(", "),
            allow_headers: config.headers.join(", "),
            expose_headers: if config.exposed_headers.is_empty() {
                None
            } else {
                Some(config.exposed_headers.join(", "))
            },
            credentials: config.credentials,
            max_age_secs: config.max_age_secs,
            preflight_continue: config.preflight_continue,
        }
    }

    fn origin_value(&self, origin: &str) -> Option<String> {
        if self.allow_any_origin {
            // `*` is invalid alongside credentials; reflect the caller.
            if self.credentials {
                Some(origin.to_string())
            } else {
                Some("*".to_string())
            }
        } else if self.origins.iter().any(|o| o == origin) {
            Some(origin.to_string())
        } else {
            None
        }
    }

    /// Decorate a response with the headers an allowed origin needs.
    pub fn apply(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        let Some(origin) = origin else { return };
        let Some(allow_origin) = self.origin_value(origin) else {
            return;
        };

        insert(headers, ACCESS_CONTROL_ALLOW_ORIGIN, &allow_origin);
        if self.credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        if let Some(expose) = &self.expose_headers {
            insert(headers, ACCESS_CONTROL_EXPOSE_HEADERS, expose);
        }
        if !self.allow_any_origin {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// Build the gateway's answer to an OPTIONS preflight.
    pub fn preflight_response(&self, origin: &str) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;

        let headers = response.headers_mut();
        if let Some(allow_origin) = self.origin_value(origin) {
            insert(headers, ACCESS_CONTROL_ALLOW_ORIGIN, &allow_origin);
            insert(headers, ACCESS_CONTROL_ALLOW_METHODS, &self.allow_methods);
            insert(headers, ACCESS_CONTROL_ALLOW_HEADERS, &self.allow_headers);
            insert(headers, ACCESS_CONTROL_MAX_AGE, &self.max_age_secs.to_string());
            if self.credentials {
                headers.insert(
                    ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }
            if !self.allow_any_origin {
                headers.append(VARY, HeaderValue::from_static("Origin"));
            }
        }
        response
    }
}

fn insert(headers: &mut HeaderMap, name: http::header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
