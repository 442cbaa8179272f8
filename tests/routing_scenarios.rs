//! Acceptance scenarios for route resolution, exercised against the
//! compiled route table without any network in the way.

use std::collections::BTreeMap;

use http::HeaderMap;

use hotlabel_gateway::config::schema::{
    GatewayConfig, PluginConfig, RouteConfig, ServiceConfig,
};
use hotlabel_gateway::config::validation::{validate_config, ValidationError};
use hotlabel_gateway::routing::{RouteError, RouteTable};

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

fn tasks_config() -> GatewayConfig {
    let mut internal = route("tasks-internal-route", &["/internal/api/v1/tasks"], 110);
    internal.strip_path = true;
    internal
        .headers
        .insert("X-Internal-Service".to_string(), "true".to_string());

    GatewayConfig {
        services: vec![ServiceConfig {
            name: "tasks-service".to_string(),
            url: "http://tasks:8002".to_string(),
            routes: vec![route("tasks-api-route", &["/api/v1/tasks"], 100), internal],
        }],
        ..GatewayConfig::default()
    }
}

fn internal_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-internal-service", "true".parse().unwrap());
    headers
}

#[test]
fn public_task_request_uses_public_route() {
    let config = tasks_config();
    validate_config(&config).unwrap();
    let table = RouteTable::from_config(&config).unwrap();

    let decision = table
        .resolve("/api/v1/tasks/abc123", &HeaderMap::new())
        .unwrap();

    assert_eq!(decision.route.name, "tasks-api-route");
    assert_eq!(decision.upstream.authority.as_str(), "tasks:8002");
    assert_eq!(decision.path, "/api/v1/tasks/abc123");
}

#[test]
fn internal_request_strips_matched_prefix() {
    let table = RouteTable::from_config(&tasks_config()).unwrap();

    let decision = table
        .resolve("/internal/api/v1/tasks/abc123", &internal_headers())
        .unwrap();

    assert_eq!(decision.route.name, "tasks-internal-route");
    assert_eq!(decision.upstream.authority.as_str(), "tasks:8002");
    assert_eq!(decision.path, "/abc123");
}

#[test]
fn internal_route_never_matches_without_sentinel_header() {
    let table = RouteTable::from_config(&tasks_config()).unwrap();

    assert!(matches!(
        table.resolve("/internal/api/v1/tasks/abc123", &HeaderMap::new()),
        Err(RouteError::NoRoute)
    ));
}

#[test]
fn unknown_path_is_no_route() {
    let table = RouteTable::from_config(&tasks_config()).unwrap();

    assert!(matches!(
        table.resolve("/unknown", &HeaderMap::new()),
        Err(RouteError::NoRoute)
    ));
}

#[test]
fn overlapping_routes_resolve_by_priority() {
    let mut config = tasks_config();
    config.services[0]
        .routes
        .push(route("tasks-detail", &[r"/api/v1/tasks/(?:\w+)"], 200));
    validate_config(&config).unwrap();
    let table = RouteTable::from_config(&config).unwrap();

    let decision = table
        .resolve("/api/v1/tasks/abc123", &HeaderMap::new())
        .unwrap();
    assert_eq!(decision.route.name, "tasks-detail");
}

#[test]
fn equal_priority_overlap_is_rejected_at_load() {
    let mut config = tasks_config();
    config.services[0]
        .routes
        .push(route("tasks-alias", &["/api/v1"], 100));

    let errors = validate_config(&config).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::PriorityConflict { .. })));
}

#[test]
fn shared_upstream_with_distinct_prefixes_coexists() {
    // providers-service and tasks-service both point at tasks:8002 under
    // different public prefixes; distinct prefixes keep the table valid.
    let mut config = tasks_config();
    config.services.push(ServiceConfig {
        name: "providers-service".to_string(),
        url: "http://tasks:8002".to_string(),
        routes: vec![route("providers-api-route", &["/api/v1/providers"], 100)],
    });
    validate_config(&config).unwrap();
    let table = RouteTable::from_config(&config).unwrap();

    let decision = table
        .resolve("/api/v1/providers/p1", &HeaderMap::new())
        .unwrap();
    assert_eq!(decision.route.name, "providers-api-route");
    assert_eq!(decision.upstream.name, "providers-service");
}
