//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, upstream
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): 429s by route
//! - `gateway_no_route_total` (counter): requests matching no route
//!
//! # Design Decisions
//! - Prometheus exposition on a dedicated listener
//! - Low-overhead updates (atomic operations via the metrics facade)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(
                "gateway_requests_total",
                "Total requests handled, by method, status, and upstream"
            );
            describe_histogram!(
                "gateway_request_duration_seconds",
                "Request latency in seconds, by upstream"
            );
            describe_counter!(
                "gateway_rate_limited_total",
                "Requests rejected by rate limiting, by route"
            );
            describe_counter!(
                "gateway_no_route_total",
                "Requests that matched no route"
            );
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to install metrics exporter");
        }
    }
}

pub fn record_request(method: &str, status: u16, upstream: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "upstream" => upstream.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "upstream" => upstream.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(route: &str) {
    counter!("gateway_rate_limited_total", "route" => route.to_string()).increment(1);
}

pub fn record_no_route() {
    counter!("gateway_no_route_total").increment(1);
}
