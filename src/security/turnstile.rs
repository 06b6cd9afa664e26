//! Human verification via Cloudflare Turnstile.
//!
//! # Responsibilities
//! - Verify a client token against the siteverify endpoint
//! - Map verification error codes to user-facing messages
//! - Classify codes as retryable or terminal
//! - Gate request bodies before they reach handlers
//!
//! # Data Flow
//! ```text
//! gated request (after rate limiting)
//!     → should_skip(path)? → handler
//!     → buffer body, parse JSON (400 on malformed)
//!     → turnstileToken | cf-turnstile-response (400 when absent)
//!     → TurnstileGate::verify → siteverify POST
//!         → failure: 403 with mapped message
//!         → success: body restored, handler runs
//! ```
//!
//! # Design Decisions
//! - Empty tokens never reach the network
//! - Missing keys fail closed: requests are verified and rejected
//! - No automatic retries; the client decides using `retryable`

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, State},
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::TurnstileConfig;
use crate::http::error::{ApiError, ErrorKind};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::client_ip::ClientIdentity;
use crate::validation::payload::{malformed_body, unreadable_body};

/// Body fields that may carry the verification token.
pub const TOKEN_FIELDS: [&str; 2] = ["turnstileToken", "cf-turnstile-response"];

pub const MISSING_INPUT_RESPONSE: &str = "missing-input-response";
pub const MISSING_SECRET_KEY: &str = "missing-secret-key";
pub const INTERNAL_ERROR: &str = "internal-error";

const RETRYABLE_CODES: [&str; 3] = ["timeout-or-duplicate", INTERNAL_ERROR, "invalid-input-response"];
const GENERIC_FAILURE: &str = "Verification failed, please try again";

/// Result of one verification attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub success: bool,
    pub error_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl VerificationOutcome {
    pub fn failure(code: &str) -> Self {
        Self {
            success: false,
            error_codes: vec![code.to_string()],
            ..Default::default()
        }
    }

    pub fn message(&self) -> &'static str {
        error_message(&self.error_codes)
    }

    pub fn is_retryable(&self) -> bool {
        is_retryable(&self.error_codes)
    }
}

/// Siteverify wire format.
#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
    hostname: Option<String>,
    challenge_ts: Option<String>,
    action: Option<String>,
}

impl From<SiteverifyResponse> for VerificationOutcome {
    fn from(r: SiteverifyResponse) -> Self {
        Self {
            success: r.success,
            error_codes: r.error_codes,
            hostname: r.hostname,
            challenge_timestamp: r.challenge_ts,
            action: r.action,
        }
    }
}

/// User-facing message for the first error code; generic when unknown.
pub fn error_message(codes: &[String]) -> &'static str {
    match codes.first().map(String::as_str) {
        Some(MISSING_SECRET_KEY) => "Verification service not configured",
        Some("missing-input-secret") | Some("invalid-input-secret") => "Service configuration error",
        Some(MISSING_INPUT_RESPONSE) => "Please complete the verification challenge",
        Some("invalid-input-response") => "Verification has expired, please try again",
        Some("bad-request") => "Invalid request format",
        Some("timeout-or-duplicate") => "Verification timeout or duplicate submission",
        Some(INTERNAL_ERROR) => "Verification service temporarily unavailable",
        _ => GENERIC_FAILURE,
    }
}

/// Whether the client may retry immediately. No codes at all counts as retryable.
pub fn is_retryable(codes: &[String]) -> bool {
    codes.is_empty() || codes.iter().any(|c| RETRYABLE_CODES.contains(&c.as_str()))
}

/// Verification client shared by every gated request.
pub struct TurnstileGate {
    client: reqwest::Client,
    secret_key: Option<String>,
    verify_url: String,
    skip: bool,
    skip_paths: Vec<String>,
    configured: bool,
}

impl TurnstileGate {
    pub fn new(config: &TurnstileConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            secret_key: config
                .secret_key
                .clone()
                .filter(|s| !s.trim().is_empty()),
            verify_url: config.verify_url.clone(),
            skip: config.skip,
            skip_paths: config.skip_paths.clone(),
            configured: config.is_configured(),
        })
    }

    /// Paths and operator overrides that bypass verification.
    pub fn should_skip(&self, path: &str) -> bool {
        if self.skip_paths.iter().any(|p| p == path) {
            return true;
        }
        if self.skip {
            tracing::debug!(path, "Skipping verification (explicitly disabled)");
            return true;
        }
        if !self.configured {
            tracing::warn!(path, "Verification keys not configured, blocking request");
        }
        false
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Verify `token`, optionally forwarding the client address.
    pub async fn verify(&self, token: &str, remote_ip: Option<&str>) -> VerificationOutcome {
        if token.trim().is_empty() {
            return VerificationOutcome::failure(MISSING_INPUT_RESPONSE);
        }
        let Some(secret) = self.secret_key.as_deref() else {
            tracing::error!("Verification secret key not configured");
            return VerificationOutcome::failure(MISSING_SECRET_KEY);
        };

        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = match self.client.post(&self.verify_url).form(&form).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::error!(status = %r.status(), "Verification endpoint returned error status");
                return VerificationOutcome::failure(INTERNAL_ERROR);
            }
            Err(e) => {
                tracing::error!(error = %e, "Verification request failed");
                return VerificationOutcome::failure(INTERNAL_ERROR);
            }
        };

        match response.json::<SiteverifyResponse>().await {
            Ok(body) => body.into(),
            Err(e) => {
                tracing::error!(error = %e, "Verification response was not valid JSON");
                VerificationOutcome::failure(INTERNAL_ERROR)
            }
        }
    }
}

/// Where a verification came from, for the audit event.
#[derive(Debug, Clone, Copy)]
pub struct VerificationContext<'a> {
    pub ip: &'a str,
    pub user_agent: &'a str,
    pub url: &'a str,
}

impl<'a> VerificationContext<'a> {
    pub fn new(identity: &'a ClientIdentity, headers: &'a HeaderMap, url: &'a str) -> Self {
        Self {
            ip: identity.as_str(),
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(""),
            url,
        }
    }
}

impl TurnstileGate {
    /// `verify`, plus the `verification_*` event and counter.
    pub async fn verify_and_record(&self, token: &str, ctx: VerificationContext<'_>) -> VerificationOutcome {
        let outcome = self.verify(token, Some(ctx.ip)).await;
        if outcome.success {
            tracing::info!(
                event = "verification_success",
                ip = ctx.ip,
                hostname = outcome.hostname.as_deref().unwrap_or(""),
                action = outcome.action.as_deref().unwrap_or(""),
                user_agent = ctx.user_agent,
                url = ctx.url,
                "Verification succeeded"
            );
            metrics::record_verification("success");
        } else {
            tracing::warn!(
                event = "verification_failed",
                ip = ctx.ip,
                error_codes = ?outcome.error_codes,
                user_agent = ctx.user_agent,
                url = ctx.url,
                "Verification failed"
            );
            metrics::record_verification("failed");
        }
        outcome
    }
}

/// First non-empty token among the recognised body fields.
pub fn extract_token(body: &Value) -> Option<&str> {
    TOKEN_FIELDS
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .find(|token| !token.trim().is_empty())
}

/// Middleware enforcing verification on gated routes.
pub async fn turnstile_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if state.gate.should_skip(&path) {
        return next.run(request).await;
    }

    let identity = ClientIdentity::from_headers(request.headers());
    let url = request.uri().to_string();
    let (parts, body) = request.into_parts();

    // Buffer through the extractor so the configured body limit applies and
    // only a real length overrun turns into 413.
    let mut buffered = Request::new(body);
    *buffered.extensions_mut() = parts.extensions.clone();
    let bytes = match Bytes::from_request(buffered, &()).await {
        Ok(bytes) => bytes,
        Err(rejection) => {
            tracing::warn!(ip = %identity, error = %rejection, "Failed to read request body");
            return unreadable_body(rejection).into_response();
        }
    };

    let parsed: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => return malformed_body(&e).into_response(),
    };

    let Some(token) = extract_token(&parsed) else {
        metrics::record_verification("missing");
        return ApiError::new(
            ErrorKind::TurnstileMissing,
            "Please complete the verification challenge",
        )
        .into_response();
    };

    let ctx = VerificationContext::new(&identity, &parts.headers, &url);
    let outcome = state.gate.verify_and_record(token, ctx).await;
    if !outcome.success {
        return ApiError::new(ErrorKind::TurnstileFailed, outcome.message())
            .with_details(serde_json::json!(outcome.error_codes))
            .with_retryable(outcome.is_retryable())
            .into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn gate_for(verify_url: String, secret: Option<&str>) -> TurnstileGate {
        let config = TurnstileConfig {
            secret_key: secret.map(str::to_string),
            site_key: Some("site".into()),
            verify_url,
            timeout_secs: 2,
            ..Default::default()
        };
        TurnstileGate::new(&config).unwrap()
    }

    /// Siteverify stand-in that counts calls and replies with `reply`.
    async fn mock_siteverify(reply: Value) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/siteverify",
            axum::routing::post(move || {
                let counter = counter.clone();
                let reply = reply.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(reply)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/siteverify", addr), hits)
    }

    #[test]
    fn test_first_code_wins() {
        assert_eq!(
            error_message(&codes(&["timeout-or-duplicate", "bad-request"])),
            "Verification timeout or duplicate submission"
        );
        assert_eq!(error_message(&codes(&["something-new"])), GENERIC_FAILURE);
        assert_eq!(error_message(&[]), GENERIC_FAILURE);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&codes(&["internal-error"])));
        assert!(is_retryable(&codes(&["bad-request", "invalid-input-response"])));
        assert!(!is_retryable(&codes(&["invalid-input-secret"])));
        assert!(is_retryable(&[]));
    }

    #[test]
    fn test_extract_token_prefers_first_non_empty() {
        let body = serde_json::json!({"turnstileToken": "", "cf-turnstile-response": "abc"});
        assert_eq!(extract_token(&body), Some("abc"));
        assert_eq!(extract_token(&serde_json::json!({"prompt": "x"})), None);
    }

    #[tokio::test]
    async fn test_empty_token_skips_network() {
        let (url, hits) = mock_siteverify(serde_json::json!({"success": true})).await;
        let gate = gate_for(url, Some("secret"));

        for token in ["", "   "] {
            let outcome = gate.verify(token, Some("1.2.3.4")).await;
            assert!(!outcome.success);
            assert_eq!(outcome.error_codes, codes(&[MISSING_INPUT_RESPONSE]));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_token_maps_codes() {
        let (url, hits) = mock_siteverify(serde_json::json!({
            "success": false,
            "error-codes": ["invalid-input-response"]
        }))
        .await;
        let gate = gate_for(url, Some("secret"));

        let outcome = gate.verify("well-formed-token", None).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!outcome.success);
        assert_eq!(outcome.error_codes, codes(&["invalid-input-response"]));
        assert_eq!(outcome.message(), "Verification has expired, please try again");
        assert!(outcome.is_retryable());
    }

    #[tokio::test]
    async fn test_accepted_token_keeps_metadata() {
        let (url, _) = mock_siteverify(serde_json::json!({
            "success": true,
            "hostname": "example.com",
            "challenge_ts": "2024-01-01T00:00:00Z",
            "action": "login"
        }))
        .await;
        let outcome = gate_for(url, Some("secret")).verify("tok", None).await;
        assert!(outcome.success);
        assert_eq!(outcome.hostname.as_deref(), Some("example.com"));
        assert_eq!(outcome.action.as_deref(), Some("login"));
    }

    #[tokio::test]
    async fn test_missing_secret_fails_closed() {
        let (url, hits) = mock_siteverify(serde_json::json!({"success": true})).await;
        let outcome = gate_for(url, None).verify("tok", None).await;
        assert_eq!(outcome.error_codes, codes(&[MISSING_SECRET_KEY]));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_internal_error() {
        let gate = gate_for("http://127.0.0.1:1/siteverify".into(), Some("secret"));
        let outcome = gate.verify("tok", None).await;
        assert_eq!(outcome.error_codes, codes(&[INTERNAL_ERROR]));
    }

    #[tokio::test]
    async fn test_verification_is_logged_with_context() {
        let (url, _) = mock_siteverify(serde_json::json!({
            "success": true,
            "hostname": "example.com"
        }))
        .await;
        let gate = gate_for(url, Some("secret"));
        let ctx = VerificationContext {
            ip: "198.51.100.4",
            user_agent: "curl/8",
            url: "/api/text-to-image",
        };

        let (_guard, logs) = crate::observability::logging::capture_logs();
        assert!(gate.verify_and_record("tok", ctx).await.success);
        assert!(!gate.verify_and_record("", ctx).await.success);

        let logs = logs.contents();
        assert!(logs.contains("verification_success"));
        assert!(logs.contains("verification_failed"));
        assert!(logs.contains("198.51.100.4"));
        assert!(logs.contains(MISSING_INPUT_RESPONSE));
    }

    #[test]
    fn test_skip_rules() {
        let gate = gate_for("http://127.0.0.1:1/".into(), Some("secret"));
        assert!(gate.should_skip("/api/health"));
        assert!(!gate.should_skip("/api/text-to-image"));

        let mut config = TurnstileConfig::default();
        config.skip = true;
        assert!(TurnstileGate::new(&config).unwrap().should_skip("/api/text-to-image"));

        // Unconfigured keys never skip.
        let unconfigured = TurnstileGate::new(&TurnstileConfig::default()).unwrap();
        assert!(!unconfigured.is_configured());
        assert!(!unconfigured.should_skip("/api/text-to-image"));
    }
}
