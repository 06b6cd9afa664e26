//! Fixed-window rate limiting keyed by client identity.
//!
//! # Data Flow
//! ```text
//! request
//!     → ClientIdentity::from_headers
//!     → FixedWindowRateLimiter::check_limit (atomic per key)
//!         → denied: 429 envelope + X-RateLimit-* + Retry-After
//!         → allowed: downstream, then X-RateLimit-* on the response
//! ```
//!
//! # Design Decisions
//! - Fixed window; a burst of up to 2x the limit across a window seam is accepted
//! - Denials neither increment the counter nor move the window
//! - Time comes from an injectable `Clock` so tests control the window
//! - One limiter per process, shared through `AppState`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::http::error::{ApiError, ErrorKind};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::client_ip::ClientIdentity;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Source of wall-clock milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Hand-driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    window_reset_at: u64,
}

/// Outcome of a single `check_limit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Absolute end of the current window, ms since epoch.
    pub reset_at_ms: u64,
}

impl RateLimitDecision {
    /// Whole seconds until the window ends, rounded up.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
    }

    /// Window end as an ISO-8601 timestamp.
    pub fn reset_iso(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.reset_at_ms as i64)
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default()
    }

    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        if let Ok(reset) = HeaderValue::from_str(&self.reset_iso()) {
            headers.insert(X_RATELIMIT_RESET, reset);
        }
    }
}

/// Point-in-time view of one tracked key, for the admin API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimiterEntrySnapshot {
    pub key: String,
    pub count: u32,
    pub reset_at: String,
}

/// Per-key fixed-window counter.
pub struct FixedWindowRateLimiter {
    max_requests: u32,
    window_ms: u64,
    entries: DashMap<String, RateLimitEntry>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window_ms: window.as_millis() as u64,
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(
            config.max_requests,
            Duration::from_millis(config.window_ms),
            clock,
        )
    }

    /// Admit or deny one request for `key`.
    ///
    /// The shard lock is held across read-compare-increment, so concurrent
    /// calls for the same key never lose updates.
    pub fn check_limit(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.now_ms();
        let fresh = RateLimitEntry {
            count: 1,
            window_reset_at: now + self.window_ms,
        };

        let mut entry = self.entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_reset_at: 0,
        });
        let state = entry.value_mut();

        if state.count == 0 || state.window_reset_at <= now {
            *state = fresh;
            return self.decision(true, self.max_requests.saturating_sub(1), fresh.window_reset_at);
        }

        if state.count >= self.max_requests {
            return self.decision(false, 0, state.window_reset_at);
        }

        state.count += 1;
        self.decision(
            true,
            self.max_requests.saturating_sub(state.count),
            state.window_reset_at,
        )
    }

    fn decision(&self, allowed: bool, remaining: u32, reset_at_ms: u64) -> RateLimitDecision {
        RateLimitDecision {
            allowed,
            limit: self.max_requests,
            remaining,
            reset_at_ms,
        }
    }

    /// Drop every entry whose window has ended. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.window_reset_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn snapshot(&self) -> Vec<LimiterEntrySnapshot> {
        self.entries
            .iter()
            .map(|e| LimiterEntrySnapshot {
                key: e.key().clone(),
                count: e.value().count,
                reset_at: chrono::DateTime::from_timestamp_millis(e.value().window_reset_at as i64)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

fn describe_window(window: Duration) -> String {
    match window.as_secs() {
        60 => "minute".to_string(),
        3600 => "hour".to_string(),
        1 => "second".to_string(),
        secs => format!("{} seconds", secs),
    }
}

/// Middleware applying the shared limiter to gated routes.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.rate_limit.enabled {
        return next.run(request).await;
    }

    let identity = ClientIdentity::from_headers(request.headers());
    let decision = state.limiter.check_limit(identity.as_str());

    if !decision.allowed {
        let retry_after = decision.retry_after_secs(state.limiter.now_ms());
        tracing::warn!(
            event = "rate_limit_exceeded",
            ip = %identity,
            path = %request.uri().path(),
            limit = decision.limit,
            retry_after,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited();

        let message = format!(
            "Maximum {} requests per {} per IP",
            decision.limit,
            describe_window(state.limiter.window())
        );
        let mut response = ApiError::new(ErrorKind::TooManyRequests, message)
            .with_retry_after(retry_after)
            .into_response();
        decision.apply_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    response
}
