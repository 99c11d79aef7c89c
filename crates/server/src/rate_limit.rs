//! Fixed-window request throttling for money-moving writes, payment
//! verification and the gateway webhook.
//!
//! Requests are counted per authenticated account, or per peer address when
//! nobody is authenticated. State is in memory and per process.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;

use crate::{ErrorBody, server::AuthAccount};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per key and window.
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    name: &'static str,
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self {
            name,
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Counts one request of `key`. `Err` carries the time until the
    /// window of `key` reopens.
    fn check(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut windows = self.windows.lock();
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });
        if now.duration_since(window.started) >= self.config.window {
            window.count = 0;
            window.started = now;
        }
        window.count = window.count.saturating_add(1);
        if window.count > self.config.max_requests {
            return Err((window.started + self.config.window).saturating_duration_since(now));
        }
        Ok(())
    }

    /// Drops windows that closed at least one window ago.
    fn cleanup(&self, now: Instant) {
        let span = self.config.window * 2;
        self.windows
            .lock()
            .retain(|_, window| now.duration_since(window.started) < span);
    }
}

/// The three throttled route groups.
#[derive(Clone, Debug)]
pub struct RateLimits {
    pub writes: RateLimiter,
    pub verify: RateLimiter,
    pub webhook: RateLimiter,
}

impl RateLimits {
    pub fn new(writes: RateLimitConfig, verify: RateLimitConfig, webhook: RateLimitConfig) -> Self {
        Self {
            writes: RateLimiter::new("writes", writes),
            verify: RateLimiter::new("verify", verify),
            webhook: RateLimiter::new("webhook", webhook),
        }
    }

    pub fn cleanup(&self) {
        let now = Instant::now();
        self.writes.cleanup(now);
        self.verify.cleanup(now);
        self.webhook.cleanup(now);
    }
}

impl Default for RateLimits {
    /// 20 writes per 15 minutes, 10 verifications per 10 minutes and
    /// 120 webhook calls per minute.
    fn default() -> Self {
        Self::new(
            RateLimitConfig::new(20, Duration::from_secs(15 * 60)),
            RateLimitConfig::new(10, Duration::from_secs(10 * 60)),
            RateLimitConfig::new(120, Duration::from_secs(60)),
        )
    }
}

fn limit_key(request: &Request) -> String {
    if let Some(AuthAccount(account_id)) = request.extensions().get::<AuthAccount>() {
        return format!("account:{account_id}");
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

pub(crate) async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = limit_key(&request);
    match limiter.check(&key, Instant::now()) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let retry_after_secs = retry_after.as_secs().max(1);
            tracing::warn!(
                limiter = limiter.name,
                key = %key,
                retry_after_secs,
                "rate limit exceeded"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(ErrorBody {
                    error: "too many requests, please try again later".to_string(),
                }),
            )
                .into_response()
        }
    }
}
