//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deployment environment (controls error details and header strictness).
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Fixed-window rate limiting per client identity.
    pub rate_limit: RateLimitConfig,

    /// Human verification (Cloudflare Turnstile).
    pub turnstile: TurnstileConfig,

    /// Generative API endpoints and deadlines.
    pub upstream: UpstreamConfig,

    /// Short-lived cache of recent upstream failures.
    pub error_cache: ErrorCacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Error envelopes carry `details` only outside production.
    pub fn exposes_details(self) -> bool {
        self == Environment::Development
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per key within one window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// How often expired entries are swept, in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 20,
            window_ms: 60_000,
            cleanup_interval_secs: 60,
        }
    }
}

/// Turnstile verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TurnstileConfig {
    /// Server-side secret shared with Cloudflare.
    pub secret_key: Option<String>,

    /// Public site key handed to the widget.
    pub site_key: Option<String>,

    /// Operator override: bypass verification entirely.
    pub skip: bool,

    /// Siteverify endpoint.
    pub verify_url: String,

    /// Verification request timeout in seconds.
    pub timeout_secs: u64,

    /// Paths that never require a token.
    pub skip_paths: Vec<String>,
}

impl TurnstileConfig {
    /// Both halves of the key pair are present and non-empty.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.secret_key) && present(&self.site_key)
    }
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            site_key: None,
            skip: false,
            verify_url: "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string(),
            timeout_secs: 10,
            skip_paths: vec!["/api/health".to_string()],
        }
    }
}

/// Upstream generative API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Image generation base URL.
    pub image_base_url: String,

    /// Text, speech and transcription base URL.
    pub text_base_url: String,

    /// Optional API token (sent as query param or bearer header).
    pub api_token: Option<String>,

    /// Optional referrer used when no token is configured.
    pub referrer: Option<String>,

    pub image_timeout_secs: u64,
    pub text_timeout_secs: u64,
    pub speech_timeout_secs: u64,
    pub transcription_timeout_secs: u64,

    /// Deadline for the full health report probes.
    pub health_timeout_secs: u64,

    /// Deadline for the HEAD liveness probe.
    pub health_quick_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            image_base_url: "https://image.pollinations.ai".to_string(),
            text_base_url: "https://text.pollinations.ai".to_string(),
            api_token: None,
            referrer: None,
            image_timeout_secs: 30,
            text_timeout_secs: 30,
            speech_timeout_secs: 30,
            transcription_timeout_secs: 30,
            health_timeout_secs: 5,
            health_quick_timeout_secs: 2,
        }
    }
}

/// Upstream failure cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorCacheConfig {
    /// How long a failure short-circuits identical requests.
    pub ttl_secs: u64,

    /// Upper bound on remembered failures.
    pub max_entries: usize,
}

impl Default for ErrorCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_entries: 100,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Number of recent requests kept for the admin statistics.
    pub request_log_capacity: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            request_log_capacity: 1000,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder key that validation refuses when the admin API is enabled.
pub const ADMIN_KEY_PLACEHOLDER: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: ADMIN_KEY_PLACEHOLDER.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            // 50MB of audio is ~67MB once base64 encoded.
            max_body_size: 70 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_limits() {
        let config = GatewayConfig::default();
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.turnstile.skip);
        assert_eq!(config.turnstile.skip_paths, vec!["/api/health".to_string()]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            environment = "development"

            [rate_limit]
            max_requests = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_turnstile_configured_requires_both_keys() {
        let mut turnstile = TurnstileConfig::default();
        assert!(!turnstile.is_configured());
        turnstile.secret_key = Some("secret".into());
        assert!(!turnstile.is_configured());
        turnstile.site_key = Some("  ".into());
        assert!(!turnstile.is_configured());
        turnstile.site_key = Some("site".into());
        assert!(turnstile.is_configured());
    }
}
