//! Request throttling per client address.
//!
//! Every client IP owns a token bucket that holds at most `burst` tokens and
//! refills at `per_second`.  Liveness probes are never throttled.  A refused
//! request is answered with 429 and a `Retry-After` hint computed from the
//! bucket's refill rate.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Paths answered without touching any bucket.
const UNTHROTTLED_PATHS: &[&str] = &["/health"];

#[derive(Debug, Clone, Copy)]
struct Limits {
    per_second: f64,
    burst: f64,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl Bucket {
    /// Spend one token, or report how long until one is available.
    fn admit(&mut self, limits: Limits, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.refilled_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * limits.per_second).min(limits.burst);
        self.refilled_at = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64(
                (1.0 - self.tokens) / limits.per_second,
            ))
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<IpAddr, Bucket>>>,
    limits: Limits,
}

impl RateLimiter {
    pub fn new(per_second: f64, burst: f64) -> Self {
        Self {
            buckets: Arc::default(),
            limits: Limits { per_second, burst },
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.rate_limit_rps, config.rate_limit_burst)
    }

    /// Admit one request from `ip`.  The error carries the wait before the
    /// next request would be admitted.
    pub async fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(ip)
            .or_insert(Bucket {
                tokens: self.limits.burst,
                refilled_at: now,
            })
            .admit(self.limits, now)
    }

    /// Drop the buckets of clients not seen for `idle`.  A dropped client
    /// starts over with a full bucket.
    pub async fn evict_idle(&self, idle: Duration) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.refilled_at) < idle);
        tracing::debug!(evicted = before - buckets.len(), "idle rate limit buckets evicted");
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    if UNTHROTTLED_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    if let Some(ip) = client_ip(&req) {
        if let Err(wait) = limiter.check(ip).await {
            let retry_after_secs = wait.as_secs_f64().ceil().max(1.0) as u64;
            warn!(ip = %ip, path = %req.uri().path(), retry_after_secs, "request throttled");
            return Err(ServerError::RateLimited { retry_after_secs });
        }
    }

    Ok(next.run(req).await)
}

/// The peer address when the server was started with connect info, else the
/// first hop reported by a fronting proxy.
fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(ConnectInfo(peer)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(peer.ip());
    }

    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
    header("x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .or_else(|| header("x-real-ip"))
        .and_then(|ip| ip.trim().parse().ok())
}
