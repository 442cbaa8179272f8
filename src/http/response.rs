//! Response shaping.
//!
//! # Responsibilities
//! - Structured JSON error envelopes for gateway-produced failures
//! - Rate-limit response headers (X-RateLimit-*)
//!
//! # Design Decisions
//! - Error bodies follow the platform's envelope:
//!   `{"error": {"code": ..., "message": ..., "details": ...}}`
//! - 404/429/500/502 are produced here; upstream responses pass through
//!   untouched apart from header hygiene

use axum::body::Body;
use axum::response::Response;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde_json::{json, Value};

use crate::policy::rate_limit::RateDecision;

/// Build a JSON error envelope response.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    error_response_with_details(status, code, message, None)
}

pub fn error_response_with_details(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<Value>,
) -> Response {
    let mut error = json!({
        "code": code,
        "message": message,
    });
    if let Some(details) = details {
        error["details"] = details;
    }
    let body = json!({ "error": error }).to_string();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// The 429 returned when a route's rate limit is exceeded.
pub fn rate_limited_response(decision: &RateDecision) -> Response {
    let mut response = error_response_with_details(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limit_exceeded",
        &format!(
            "Rate limit exceeded. Try again in {} seconds.",
            decision.reset_secs
        ),
        Some(json!({
            "limit": decision.limit,
            "window_seconds": 60,
            "reset_at": decision.reset_secs,
        })),
    );
    apply_rate_limit_headers(response.headers_mut(), decision);
    response
}

/// Stamp the X-RateLimit-* trio on a response.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    insert_num(headers, "x-ratelimit-limit", decision.limit as u64);
    insert_num(headers, "x-ratelimit-remaining", decision.remaining as u64);
    insert_num(headers, "x-ratelimit-reset", decision.reset_secs);
}

fn insert_num(headers: &mut HeaderMap, name: &'static str, value: u64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}
