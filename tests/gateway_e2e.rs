//! End-to-end tests: mock upstream, live gateway, real HTTP client.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use hotlabel_gateway::config::schema::{
    CorsConfig, GatewayConfig, PluginConfig, RateLimitConfig, RouteConfig, ServiceConfig,
};
use hotlabel_gateway::{GatewayServer, Shutdown};

mod common;

fn route(name: &str, paths: &[&str], priority: i32) -> RouteConfig {
    RouteConfig {
        name: name.to_string(),
        paths: paths.iter().map(|p| p.to_string()).collect(),
        strip_path: false,
        preserve_host: false,
        regex_priority: priority,
        headers: BTreeMap::new(),
        plugins: PluginConfig::default(),
    }
}

async fn start_gateway(config: GatewayConfig, addr: SocketAddr) -> Arc<Shutdown> {
    let server = GatewayServer::new(config).expect("route table should compile");
    let listener = TcpListener::bind(addr).await.unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let handle = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, handle).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

#[tokio::test]
async fn test_forwarding_and_header_gate() {
    let backend_addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28482".parse().unwrap();

    common::start_echo_backend(backend_addr).await;

    let mut internal = route("tasks-internal-route", &["/internal/api/v1/tasks"], 110);
    internal.strip_path = true;
    internal
        .headers
        .insert("X-Internal-Service".to_string(), "true".to_string());

    let mut config = GatewayConfig::default();
    config.listener.bind_address = gateway_addr.to_string();
    config.observability.metrics_enabled = false;
    config.services.push(ServiceConfig {
        name: "tasks-service".to_string(),
        url: format!("http://{backend_addr}"),
        routes: vec![route("tasks-api-route", &["/api/v1/tasks"], 100), internal],
    });
    // Nothing listens on this upstream; requests must come back as 502.
    config.services.push(ServiceConfig {
        name: "dead-service".to_string(),
        url: "http://127.0.0.1:28483".to_string(),
        routes: vec![route("dead-route", &["/api/v1/dead"], 100)],
    });

    let shutdown = start_gateway(config, gateway_addr).await;
    let client = reqwest::Client::new();
    let base = format!("http://{gateway_addr}");

    // Public route: path forwarded unchanged, request id stamped.
    let response = client
        .get(format!("{base}/api/v1/tasks/abc123"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(response.text().await.unwrap(), "/api/v1/tasks/abc123");

    // Query strings survive forwarding.
    let response = client
        .get(format!("{base}/api/v1/tasks?limit=5&status=open"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "/api/v1/tasks?limit=5&status=open"
    );

    // Unknown path: structured 404.
    let response = client.get(format!("{base}/unknown")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "no_route");

    // Internal route without the sentinel header: the path alone is not
    // enough.
    let response = client
        .get(format!("{base}/internal/api/v1/tasks/abc123"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // With the header: matched, and the prefix is stripped before
    // forwarding.
    let response = client
        .get(format!("{base}/internal/api/v1/tasks/abc123"))
        .header("X-Internal-Service", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "/abc123");

    // Stripping rewrites the path only; the query string is untouched.
    let response = client
        .get(format!("{base}/internal/api/v1/tasks/abc123?verbose=1"))
        .header("X-Internal-Service", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "/abc123?verbose=1");

    // Unreachable upstream: 502, not a crash.
    let response = client
        .get(format!("{base}/api/v1/dead"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "upstream_unreachable");

    shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_enforced() {
    let backend_addr: SocketAddr = "127.0.0.1:28484".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28485".parse().unwrap();

    common::start_mock_backend(backend_addr, "ok").await;

    let mut limited = route("tasks-api-route", &["/api/v1/tasks"], 100);
    limited.plugins.rate_limit = Some(RateLimitConfig {
        minute: 2,
        ..RateLimitConfig::default()
    });

    let mut config = GatewayConfig::default();
    config.listener.bind_address = gateway_addr.to_string();
    config.observability.metrics_enabled = false;
    config.services.push(ServiceConfig {
        name: "tasks-service".to_string(),
        url: format!("http://{backend_addr}"),
        routes: vec![limited],
    });

    let shutdown = start_gateway(config, gateway_addr).await;
    let client = reqwest::Client::new();
    let url = format!("http://{gateway_addr}/api/v1/tasks");

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers().get("x-ratelimit-limit").unwrap(), "2");
    assert_eq!(first.headers().get("x-ratelimit-remaining").unwrap(), "1");

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), 200);

    let third = client.get(&url).send().await.unwrap();
    assert_eq!(third.status(), 429);
    assert_eq!(third.headers().get("x-ratelimit-remaining").unwrap(), "0");
    let body: serde_json::Value = third.json().await.unwrap();
    assert_eq!(body["error"]["code"], "rate_limit_exceeded");

    shutdown.trigger();
}

#[tokio::test]
async fn test_preflight_reports_rate_limit_accounting() {
    let backend_addr: SocketAddr = "127.0.0.1:28486".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28487".parse().unwrap();

    common::start_mock_backend(backend_addr, "ok").await;

    let mut limited = route("tasks-api-route", &["/api/v1/tasks"], 100);
    limited.plugins.cors = Some(CorsConfig::default());
    limited.plugins.rate_limit = Some(RateLimitConfig {
        minute: 2,
        ..RateLimitConfig::default()
    });

    let mut config = GatewayConfig::default();
    config.listener.bind_address = gateway_addr.to_string();
    config.observability.metrics_enabled = false;
    config.services.push(ServiceConfig {
        name: "tasks-service".to_string(),
        url: format!("http://{backend_addr}"),
        routes: vec![limited],
    });

    let shutdown = start_gateway(config, gateway_addr).await;
    let client = reqwest::Client::new();
    let url = format!("http://{gateway_addr}/api/v1/tasks");

    // A preflight answered at the gateway consumes a window token, so it
    // carries the same accounting headers as a proxied response.
    let preflight = client
        .request(reqwest::Method::OPTIONS, &url)
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), 204);
    assert!(preflight
        .headers()
        .get("access-control-allow-origin")
        .is_some());
    assert_eq!(preflight.headers().get("x-ratelimit-limit").unwrap(), "2");
    assert_eq!(
        preflight.headers().get("x-ratelimit-remaining").unwrap(),
        "1"
    );

    // The token it consumed counts against the same window.
    let next = client.get(&url).send().await.unwrap();
    assert_eq!(next.status(), 200);
    assert_eq!(next.headers().get("x-ratelimit-remaining").unwrap(), "0");

    shutdown.trigger();
}
