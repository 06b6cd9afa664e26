//! In-memory request log for the admin API.
//!
//! Bounded, newest first. Feeds `/admin/stats` and `/admin/logs`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::X_RESPONSE_TIME;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::client_ip::ClientIdentity;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: String,
    pub ip: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub status: u16,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub total_requests: usize,
    /// Percentage of logged responses with status >= 400.
    pub error_rate: f64,
    pub average_response_time: f64,
    pub requests_per_ip: BTreeMap<String, usize>,
}

pub struct RequestLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn record(&self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Newest `limit` entries.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().take(limit).cloned().collect()
    }

    pub fn by_ip(&self, ip: &str) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().filter(|e| e.ip == ip).cloned().collect()
    }

    pub fn stats(&self) -> RequestStats {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let total = entries.len();
        let errors = entries.iter().filter(|e| e.status >= 400).count();
        let time_sum: u64 = entries.iter().map(|e| e.response_time_ms).sum();

        let mut requests_per_ip = BTreeMap::new();
        for entry in entries.iter() {
            *requests_per_ip.entry(entry.ip.clone()).or_insert(0) += 1;
        }

        RequestStats {
            total_requests: total,
            error_rate: if total > 0 {
                errors as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            average_response_time: if total > 0 {
                time_sum as f64 / total as f64
            } else {
                0.0
            },
            requests_per_ip,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Logs, measures and records every request that reaches the router.
pub async fn record_requests(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let identity = ClientIdentity::from_headers(request.headers());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(
        request_id = %request_id,
        ip = %identity,
        method = %method,
        path = %path,
        "Request started"
    );

    let mut response = next.run(request).await;
    let elapsed = started.elapsed();
    let status = response.status();
    let error = response
        .extensions()
        .get::<ApiError>()
        .map(|e| e.message.clone());

    if let Ok(value) = HeaderValue::from_str(&format!("{}ms", elapsed.as_millis())) {
        response
            .headers_mut()
            .entry(HeaderName::from_static(X_RESPONSE_TIME))
            .or_insert(value);
    }

    tracing::info!(
        request_id = %request_id,
        ip = %identity,
        method = %method,
        path = %path,
        status = status.as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Request completed"
    );

    let endpoint = if status == StatusCode::NOT_FOUND {
        "unmatched"
    } else {
        path.as_str()
    };
    metrics::record_request(endpoint, status.as_u16(), started);

    state.request_log.record(LogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        ip: identity.to_string(),
        method,
        path,
        user_agent,
        status: status.as_u16(),
        response_time_ms: elapsed.as_millis() as u64,
        error,
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ip: &str, status: u16, ms: u64) -> LogEntry {
        LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            ip: ip.to_string(),
            method: "POST".into(),
            path: "/api/text-to-image".into(),
            user_agent: None,
            status,
            response_time_ms: ms,
            error: None,
        }
    }

    #[test]
    fn test_bounded_newest_first() {
        let log = RequestLog::new(3);
        for ms in 1..=5 {
            log.record(entry("1.1.1.1", 200, ms));
        }
        assert_eq!(log.len(), 3);
        let recent = log.recent(10);
        assert_eq!(recent[0].response_time_ms, 5);
        assert_eq!(recent[2].response_time_ms, 3);
        assert_eq!(log.recent(1).len(), 1);
    }

    #[test]
    fn test_stats_and_ip_filter() {
        let log = RequestLog::new(100);
        log.record(entry("1.1.1.1", 200, 10));
        log.record(entry("1.1.1.1", 429, 20));
        log.record(entry("2.2.2.2", 500, 30));
        log.record(entry("2.2.2.2", 200, 40));

        let stats = log.stats();
        assert_eq!(stats.total_requests, 4);
        assert!((stats.error_rate - 50.0).abs() < f64::EPSILON);
        assert!((stats.average_response_time - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.requests_per_ip["2.2.2.2"], 2);
        assert_eq!(log.by_ip("1.1.1.1").len(), 2);
    }

    #[test]
    fn test_empty_stats() {
        let stats = RequestLog::new(10).stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.error_rate, 0.0);
    }
}
