//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, gating decisions, upstream failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by endpoint, status
//! - `gateway_request_duration_seconds` (histogram): latency by endpoint
//! - `gateway_rate_limited_total` (counter): 429s issued by the limiter
//! - `gateway_verifications_total` (counter): Turnstile outcomes
//! - `gateway_upstream_failures_total` (counter): failed upstream calls by kind
//! - `gateway_error_cache_hits_total` (counter): requests refused from the failure cache
//! - `gateway_rate_limiter_keys` (gauge): identities currently tracked
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(endpoint: &str, status: u16, started: Instant) {
    let endpoint = endpoint.to_string();
    ::metrics::counter!(
        "gateway_requests_total",
        "endpoint" => endpoint.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "endpoint" => endpoint)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    ::metrics::counter!("gateway_rate_limited_total").increment(1);
}

/// `outcome` is one of `success`, `failed`, `missing`.
pub fn record_verification(outcome: &'static str) {
    ::metrics::counter!("gateway_verifications_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_failure(kind: &'static str) {
    ::metrics::counter!("gateway_upstream_failures_total", "kind" => kind).increment(1);
}

pub fn record_error_cache_hit() {
    ::metrics::counter!("gateway_error_cache_hits_total").increment(1);
}

pub fn set_limiter_keys(count: usize) {
    ::metrics::gauge!("gateway_rate_limiter_keys").set(count as f64);
}
