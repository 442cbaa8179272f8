//! Per-route rate limiting.
//!
//! # Responsibilities
//! - Enforce a per-client ceiling over a fixed 60-second window
//! - Key clients by IP or by a configured header (publisher ID)
//! - Report limit/remaining/reset for response headers
//!
//! # Design Decisions
//! - Fixed window: counters reset at minute boundaries
//! - `local` scope: state is per-process; gateway replicas do not share
//!   counters
//! - Sharded concurrent map keeps the hot path lock-cheap
//! - Stale client slots are swept once per window rollover so the map
//!   stays bounded by the active client set, not every client ever seen

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use http::HeaderMap;

use crate::config::schema::{RateLimitConfig, RateLimitKey};

const WINDOW_SECS: u64 = 60;
const ANONYMOUS_KEY: &str = "anonymous";

/// Outcome of a rate-limit check, carrying what the response headers need.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the current window resets.
    pub reset_secs: u64,
}

struct WindowSlot {
    window: u64,
    count: u32,
}

/// Fixed-window limiter for one route.
pub struct RateLimiter {
    limit: u32,
    limit_by: RateLimitKey,
    header_name: Option<String>,
    counters: DashMap<String, WindowSlot>,
    /// Highest window a stale-slot sweep has run for.
    swept_window: AtomicU64,
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            limit: config.minute,
            limit_by: config.limit_by,
            header_name: config.header_name.clone(),
            counters: DashMap::new(),
            swept_window: AtomicU64::new(0),
        }
    }

    /// Derive the counting key for a request.
    pub fn client_key(&self, headers: &HeaderMap, client_ip: IpAddr) -> String {
        match self.limit_by {
            RateLimitKey::Ip => client_ip.to_string(),
            RateLimitKey::Header => {
                let name = self.header_name.as_deref().unwrap_or("x-publisher-id");
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or(ANONYMOUS_KEY)
                    .to_string()
            }
        }
    }

    /// Count this request against the client's current window.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.check_at(key, now)
    }

    fn check_at(&self, key: &str, now_secs: u64) -> RateDecision {
        let window = now_secs / WINDOW_SECS;
        let reset_secs = WINDOW_SECS - (now_secs % WINDOW_SECS);

        self.sweep_stale(window);

        let mut slot = self
            .counters
            .entry(key.to_string())
            .or_insert(WindowSlot { window, count: 0 });
        if slot.window != window {
            slot.window = window;
            slot.count = 0;
        }

        if slot.count >= self.limit {
            RateDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_secs,
            }
        } else {
            slot.count += 1;
            RateDecision {
                allowed: true,
                limit: self.limit,
                remaining: self.limit - slot.count,
                reset_secs,
            }
        }
    }

    /// Drop slots for clients not seen in the current or previous window.
    /// Runs at most once per window; without it the map would grow by one
    /// entry for every distinct client ever seen.
    fn sweep_stale(&self, window: u64) {
        let last = self.swept_window.load(Ordering::Relaxed);
        if window <= last {
            return;
        }
        if self
            .swept_window
            .compare_exchange(last, window, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            self.counters.retain(|_, slot| slot.window + 1 >= window);
        }
    }
}
