//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, timeouts > 0)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ConfigIssue>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{GatewayConfig, ADMIN_KEY_PLACEHOLDER};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the offending key.
    pub key: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Validate a configuration, collecting every issue found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.rate_limit.max_requests == 0 {
        issues.push(ConfigIssue::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if config.rate_limit.window_ms == 0 {
        issues.push(ConfigIssue::new("rate_limit.window_ms", "must be greater than 0"));
    }
    if config.rate_limit.cleanup_interval_secs == 0 {
        issues.push(ConfigIssue::new(
            "rate_limit.cleanup_interval_secs",
            "must be greater than 0",
        ));
    }

    check_url(&mut issues, "turnstile.verify_url", &config.turnstile.verify_url);
    check_url(&mut issues, "upstream.image_base_url", &config.upstream.image_base_url);
    check_url(&mut issues, "upstream.text_base_url", &config.upstream.text_base_url);

    let timeouts = [
        ("turnstile.timeout_secs", config.turnstile.timeout_secs),
        ("upstream.image_timeout_secs", config.upstream.image_timeout_secs),
        ("upstream.text_timeout_secs", config.upstream.text_timeout_secs),
        ("upstream.speech_timeout_secs", config.upstream.speech_timeout_secs),
        (
            "upstream.transcription_timeout_secs",
            config.upstream.transcription_timeout_secs,
        ),
        ("upstream.health_timeout_secs", config.upstream.health_timeout_secs),
        (
            "upstream.health_quick_timeout_secs",
            config.upstream.health_quick_timeout_secs,
        ),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (key, value) in timeouts {
        if value == 0 {
            issues.push(ConfigIssue::new(key, "timeout must be greater than 0"));
        }
    }

    if config.security.max_body_size == 0 {
        issues.push(ConfigIssue::new("security.max_body_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        issues.push(ConfigIssue::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() || key == ADMIN_KEY_PLACEHOLDER {
            issues.push(ConfigIssue::new(
                "admin.api_key",
                "must be set to a real secret when the admin API is enabled",
            ));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            issues.push(ConfigIssue::new(
                "admin.bind_address",
                format!("'{}' is not a socket address", config.admin.bind_address),
            ));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn check_url(issues: &mut Vec<ConfigIssue>, key: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => issues.push(ConfigIssue::new(
            key,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => issues.push(ConfigIssue::new(key, format!("invalid URL: {}", e))),
    }
}
