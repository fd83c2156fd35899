//! Fixed-window, in-memory rate limiting for sensitive endpoints
//!
//! Counters are keyed by `(bucket, client)` so each endpoint family gets its
//! own budget. The limiter is process-local; multiple replicas each enforce
//! their own windows.
//!
//! Clients are identified by the socket peer. `X-Forwarded-For` and
//! `X-Real-IP` are only honoured when `TRUST_PROXY` is set, since any caller
//! can send them.

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::{config::env_flag, Error};

/// Entries beyond this count trigger a sweep of expired windows
const SWEEP_THRESHOLD: usize = 10_000;

/// How many requests a client may make per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    /// Length of the policy that opened this window
    length: Duration,
    count: u32,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= self.length
    }
}

/// Shared counter store
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    trust_proxy: bool,
    windows: DashMap<(&'static str, String), Window>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            trust_proxy: false,
            windows: DashMap::new(),
        }
    }

    /// Key clients by proxy headers instead of the socket peer
    pub fn with_trusted_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    /// Reads `RATE_LIMIT_ENABLED` (default true) and `TRUST_PROXY` (default false)
    pub fn from_env() -> Self {
        Self::new(env_flag("RATE_LIMIT_ENABLED", true))
            .with_trusted_proxy(env_flag("TRUST_PROXY", false))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn trusts_proxy(&self) -> bool {
        self.trust_proxy
    }

    /// Tracked `(bucket, client)` windows
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Drop every window that has run its full length
    fn sweep(&self, now: Instant) {
        self.windows.retain(|_, w| !w.expired(now));
    }

    /// Count one request. Returns the time until the window resets when the
    /// client is over budget.
    pub fn check(
        &self,
        bucket: &'static str,
        client: &str,
        policy: RateLimitPolicy,
    ) -> Result<(), Duration> {
        if !self.enabled {
            return Ok(());
        }

        let now = Instant::now();
        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let mut entry = self
            .windows
            .entry((bucket, client.to_string()))
            .or_insert(Window {
                started: now,
                length: policy.window,
                count: 0,
            });

        if entry.expired(now) {
            entry.started = now;
            entry.length = policy.window;
            entry.count = 0;
        }

        if entry.count >= policy.max_requests {
            return Err(policy.window.saturating_sub(now.duration_since(entry.started)));
        }

        entry.count += 1;
        Ok(())
    }
}

/// Middleware state binding a limiter to one bucket
#[derive(Debug, Clone)]
pub struct RateLimit {
    pub limiter: Arc<RateLimiter>,
    pub bucket: &'static str,
    pub policy: RateLimitPolicy,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>, bucket: &'static str, policy: RateLimitPolicy) -> Self {
        Self {
            limiter,
            bucket,
            policy,
        }
    }
}

/// Axum middleware: answers 429 with `Retry-After` once the bucket is spent.
///
/// Attach with `axum::middleware::from_fn_with_state(rate_limit, enforce)`.
pub async fn enforce(State(limit): State<RateLimit>, req: Request, next: Next) -> Response {
    let client = client_key(&req, limit.limiter.trusts_proxy());

    match limit.limiter.check(limit.bucket, &client, limit.policy) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(bucket = limit.bucket, client = %client, "Rate limit exceeded");
            Error::rate_limited(retry_after).into_response()
        }
    }
}

fn client_key(req: &Request, trust_proxy: bool) -> String {
    client_ip(req.headers(), req.extensions(), trust_proxy)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Client IP from the peer address recorded by
/// `into_make_service_with_connect_info`. Behind a trusted proxy the
/// `X-Forwarded-For` / `X-Real-IP` headers take precedence.
pub fn client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_proxy: bool,
) -> Option<String> {
    let forwarded = if trust_proxy { forwarded_for(headers) } else { None };
    forwarded.or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let first_hop = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    first_hop
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}
