//! Forwarding header hygiene.
//!
//! Helpers to strip hop-by-hop headers and add the X-Forwarded-* set.
//! Hop-by-hop filtering is applied in both directions: requests going to
//! upstreams and responses coming back to clients.

use std::net::IpAddr;

use http::header::{
    HeaderMap, HeaderName, HeaderValue, CONNECTION, HOST, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};

static HOP_BY_HOP_NAMES: &[HeaderName] = &[
    CONNECTION,
    TRANSFER_ENCODING,
    TE,
    TRAILER,
    UPGRADE,
    PROXY_AUTHORIZATION,
    PROXY_AUTHENTICATE,
];

/// Remove hop-by-hop headers: the standard set, anything listed in the
/// Connection header value, and keep-alive.
pub fn filter_hop_by_hop(headers: &mut HeaderMap) {
    let mut extra_drops = Vec::new();
    if let Some(connection) = headers.get(CONNECTION) {
        if let Ok(s) = connection.to_str() {
            for token in s.split(',').map(|t| t.trim()).filter(|t| !t.is_empty()) {
                if let Ok(name) = HeaderName::from_bytes(token.as_bytes()) {
                    extra_drops.push(name);
                }
            }
        }
    }

    for name in HOP_BY_HOP_NAMES {
        headers.remove(name);
    }
    for name in extra_drops {
        headers.remove(&name);
    }
    headers.remove(HeaderName::from_static("keep-alive"));
}

/// Record the client and original host on the forwarded request.
pub fn apply_forwarding_headers(
    headers: &mut HeaderMap,
    client_ip: IpAddr,
    original_host: Option<&HeaderValue>,
) {
    let client = client_ip.to_string();
    let forwarded_for = match headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        Some(existing) => format!("{existing}, {client}"),
        None => client,
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert("x-forwarded-for", value);
    }

    headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
    if let Some(host) = original_host {
        headers.insert("x-forwarded-host", host.clone());
    }
}

/// Set the Host header on the forwarded request: the client's original
/// host when the route preserves it, the upstream authority otherwise.
pub fn set_host(
    headers: &mut HeaderMap,
    preserve_host: bool,
    original_host: Option<&HeaderValue>,
    upstream_authority: &str,
) {
    if preserve_host {
        if let Some(host) = original_host {
            headers.insert(HOST, host.clone());
            return;
        }
    }
    if let Ok(value) = HeaderValue::from_str(upstream_authority) {
        headers.insert(HOST, value);
    }
}
