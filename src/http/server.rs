//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum router with all middleware layers
//! - Resolve each request against the route table
//! - Enforce the matched route's policy (rate limit, CORS)
//! - Rewrite and forward to the upstream, stream the response back
//! - Translate gateway failures to structured error responses
//!
//! # Design Decisions
//! - One catch-all handler: the route table, not Axum's router, decides
//!   where a request goes
//! - The route table is resolved before any policy runs; policy is
//!   route-scoped
//! - Upstream failures map to 502; resolution ambiguity maps to 500
//!   because the loader should have rejected the config

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::HOST, header::ORIGIN, HeaderValue, Method, Request, StatusCode, Uri},
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::request::{RequestIdLayer, X_REQUEST_ID};
use crate::http::response::{
    apply_rate_limit_headers, error_response, rate_limited_response,
};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::policy::headers::{apply_forwarding_headers, filter_hop_by_hop, set_host};
use crate::routing::router::BuildError;
use crate::routing::{RouteError, RouteTable};

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct GatewayState {
    pub table: Arc<RouteTable>,
    pub client: Client<HttpConnector, Body>,
}

/// The gateway's HTTP server.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Compile the route table and assemble the server.
    pub fn new(config: GatewayConfig) -> Result<Self, BuildError> {
        let table = Arc::new(RouteTable::from_config(&config)?);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = GatewayState { table, client };
        let router = Self::build_router(&config, state);

        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: GatewayState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown coordinator fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Arc<Shutdown>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut rx = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Main proxy handler: resolve, enforce policy, forward.
async fn proxy_handler(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let method = request.method().clone();
    let method_str = method.to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let original_host = request.headers().get(HOST).cloned();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Routing request"
    );

    let decision = match state.table.resolve(&path, request.headers()) {
        Ok(decision) => decision,
        Err(RouteError::NoRoute) => {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            metrics::record_no_route();
            metrics::record_request(&method_str, 404, "none", start);
            return error_response(
                StatusCode::NOT_FOUND,
                "no_route",
                "No route matches the request",
            );
        }
        Err(err @ RouteError::Ambiguous { .. }) => {
            // The loader rejects ambiguous tables; reaching this means the
            // config bypassed validation. Fail loudly.
            tracing::error!(request_id = %request_id, path = %path, error = %err, "Ambiguous route");
            metrics::record_request(&method_str, 500, "none", start);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "ambiguous_route",
                "Route resolution was ambiguous; check gateway configuration",
            );
        }
    };
    let route = decision.route;
    let upstream = decision.upstream;

    // Rate limit. Health probes are never throttled.
    let mut rate_decision = None;
    if let Some(limiter) = &route.policy.rate_limit {
        if !is_probe_path(&decision.path) {
            let key = limiter.client_key(request.headers(), addr.ip());
            let checked = limiter.check(&key);
            if !checked.allowed {
                tracing::warn!(
                    request_id = %request_id,
                    route = %route.name,
                    client = %key,
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited(&route.name);
                metrics::record_request(&method_str, 429, &upstream.name, start);
                let mut response = rate_limited_response(&checked);
                if let Some(cors) = &route.policy.cors {
                    cors.apply(origin.as_deref(), response.headers_mut());
                }
                return response;
            }
            rate_decision = Some(checked);
        }
    }

    // Answer CORS preflights at the gateway unless the route opts out.
    if method == Method::OPTIONS {
        if let Some(cors) = &route.policy.cors {
            if !cors.preflight_continue {
                if let Some(origin) = origin.as_deref() {
                    metrics::record_request(&method_str, 204, &upstream.name, start);
                    let mut response = cors.preflight_response(origin);
                    // Preflights consume a window token like any other
                    // request, so they report the same accounting.
                    if let Some(checked) = &rate_decision {
                        apply_rate_limit_headers(response.headers_mut(), checked);
                    }
                    return response;
                }
            }
        }
    }

    // Rewrite for the upstream.
    let (mut parts, body) = request.into_parts();
    filter_hop_by_hop(&mut parts.headers);
    set_host(
        &mut parts.headers,
        route.preserve_host,
        original_host.as_ref(),
        upstream.authority.as_str(),
    );
    apply_forwarding_headers(&mut parts.headers, addr.ip(), original_host.as_ref());

    let path_and_query = match &query {
        Some(q) => format!("{}?{}", decision.path, q),
        None => decision.path.clone(),
    };
    parts.uri = match Uri::builder()
        .scheme(upstream.scheme.clone())
        .authority(upstream.authority.clone())
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(err) => {
            tracing::error!(request_id = %request_id, error = %err, "Failed to build upstream URI");
            metrics::record_request(&method_str, 500, &upstream.name, start);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Failed to build upstream request",
            );
        }
    };
    let upstream_request = Request::from_parts(parts, body);

    match state.client.request(upstream_request).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method_str, status.as_u16(), &upstream.name, start);

            let (mut parts, body) = response.into_parts();
            filter_hop_by_hop(&mut parts.headers);
            if let Some(cors) = &route.policy.cors {
                cors.apply(origin.as_deref(), &mut parts.headers);
            }
            if let Some(checked) = &rate_decision {
                apply_rate_limit_headers(&mut parts.headers, checked);
            }
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                parts.headers.insert(X_REQUEST_ID, value);
            }
            Response::from_parts(parts, Body::new(body))
        }
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                upstream = %upstream.name,
                error = %err,
                "Upstream request failed"
            );
            metrics::record_request(&method_str, 502, &upstream.name, start);
            let mut response = error_response(
                StatusCode::BAD_GATEWAY,
                "upstream_unreachable",
                "Upstream request failed",
            );
            if let Some(cors) = &route.policy.cors {
                cors.apply(origin.as_deref(), response.headers_mut());
            }
            response
        }
    }
}

/// Liveness/readiness probes pass through without rate accounting.
fn is_probe_path(path: &str) -> bool {
    path == "/health" || path == "/ready" || path.ends_with("/health") || path.ends_with("/ready")
}
