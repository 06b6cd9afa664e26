use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::Environment;
use crate::http::server::AppState;
use crate::observability::{LogEntry, RequestStats};
use crate::security::rate_limit::LimiterEntrySnapshot;

const DEFAULT_LOG_LIMIT: usize = 100;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub environment: Environment,
    pub uptime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimiterStatus {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_ms: u64,
    pub tracked_keys: usize,
    pub entries: Vec<LimiterEntrySnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub ip: Option<String>,
    pub limit: Option<usize>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        environment: state.config.environment,
        uptime: state.health.uptime().as_secs(),
    })
}

pub async fn get_limiter(State(state): State<AppState>) -> Json<LimiterStatus> {
    let limiter = &state.limiter;
    Json(LimiterStatus {
        enabled: state.config.rate_limit.enabled,
        max_requests: limiter.max_requests(),
        window_ms: limiter.window().as_millis() as u64,
        tracked_keys: limiter.len(),
        entries: limiter.snapshot(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<RequestStats> {
    Json(state.request_log.stats())
}

/// Newest entries first; `ip` narrows to one client.
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Json<Vec<LogEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    let entries = match query.ip.as_deref() {
        Some(ip) => state.request_log.by_ip(ip).into_iter().take(limit).collect(),
        None => state.request_log.recent(limit),
    };
    Json(entries)
}
