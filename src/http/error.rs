//! Error taxonomy and the uniform JSON error envelope.
//!
//! # Responsibilities
//! - Classify every failure into an `ErrorKind` (status + machine code)
//! - Render one envelope shape for all error responses
//! - Fill in request-scoped fields (path, timestamp, details gating) at a
//!   single boundary so handlers only describe *what* went wrong
//!
//! # Data Flow
//! ```text
//! handler / middleware returns Err(ApiError)
//!     → ApiError::into_response (status, headers, provisional body,
//!       ApiError stashed in response extensions)
//!     → render_errors middleware (outermost)
//!         → re-renders the body with path + environment rules
//!         → wraps bare framework errors (404/405/408/413/panic) too
//!     → client always receives JSON
//! ```
//!
//! # Design Decisions
//! - `details` never leave the process in production
//! - Original upstream statuses are translated, not forwarded

use std::any::Any;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::Environment;
use crate::http::server::AppState;

/// Failure classes with their HTTP status and machine-readable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    TooManyRequests,
    Internal,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    InvalidPrompt,
    PromptTooLong,
    InvalidImageSize,
    InvalidAudioFormat,
    AudioTooLarge,
    TextTooLong,
    ApiLimitExceeded,
    TurnstileMissing,
    TurnstileFailed,
    TurnstileServiceError,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest
            | ErrorKind::Validation
            | ErrorKind::InvalidPrompt
            | ErrorKind::PromptTooLong
            | ErrorKind::InvalidImageSize
            | ErrorKind::InvalidAudioFormat
            | ErrorKind::AudioTooLarge
            | ErrorKind::TextTooLong
            | ErrorKind::TurnstileMissing => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden | ErrorKind::TurnstileFailed => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::TooManyRequests | ErrorKind::ApiLimitExceeded => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorKind::ServiceUnavailable | ErrorKind::TurnstileServiceError => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorKind::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ErrorKind::TooManyRequests => "TOO_MANY_REQUESTS",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
            ErrorKind::BadGateway => "BAD_GATEWAY",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::GatewayTimeout => "GATEWAY_TIMEOUT",
            ErrorKind::InvalidPrompt => "INVALID_PROMPT",
            ErrorKind::PromptTooLong => "PROMPT_TOO_LONG",
            ErrorKind::InvalidImageSize => "INVALID_IMAGE_SIZE",
            ErrorKind::InvalidAudioFormat => "INVALID_AUDIO_FORMAT",
            ErrorKind::AudioTooLarge => "AUDIO_TOO_LARGE",
            ErrorKind::TextTooLong => "TEXT_TOO_LONG",
            ErrorKind::ApiLimitExceeded => "API_LIMIT_EXCEEDED",
            ErrorKind::TurnstileMissing => "TURNSTILE_MISSING",
            ErrorKind::TurnstileFailed => "TURNSTILE_FAILED",
            ErrorKind::TurnstileServiceError => "TURNSTILE_SERVICE_ERROR",
        }
    }

    /// Short human title used as the envelope's `error` field.
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::TooManyRequests | ErrorKind::ApiLimitExceeded => "Too many requests",
            ErrorKind::TurnstileMissing => "Verification required",
            ErrorKind::TurnstileFailed => "Verification failed",
            ErrorKind::TurnstileServiceError => "Verification service error",
            ErrorKind::Validation
            | ErrorKind::InvalidPrompt
            | ErrorKind::PromptTooLong
            | ErrorKind::InvalidImageSize
            | ErrorKind::InvalidAudioFormat
            | ErrorKind::AudioTooLarge
            | ErrorKind::TextTooLong => "Validation failed",
            other => other
                .status()
                .canonical_reason()
                .unwrap_or("Error"),
        }
    }

    /// Best-effort classification for responses produced outside our handlers.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => ErrorKind::MethodNotAllowed,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::TooManyRequests,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ErrorKind::GatewayTimeout,
            StatusCode::BAD_GATEWAY => ErrorKind::BadGateway,
            StatusCode::SERVICE_UNAVAILABLE => ErrorKind::ServiceUnavailable,
            s if s.is_client_error() => ErrorKind::BadRequest,
            _ => ErrorKind::Internal,
        }
    }
}

/// A classified failure, convertible into the JSON envelope.
#[derive(Debug, Clone, Error)]
#[error("{} ({}): {message}", .kind.code(), .status)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub message: String,
    pub field: Option<String>,
    pub details: Option<Value>,
    pub retry_after: Option<u64>,
    pub retryable: Option<bool>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.status(),
            message: message.into(),
            field: None,
            details: None,
            retry_after: None,
            retryable: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn prompt_too_long(max: usize) -> Self {
        Self::new(
            ErrorKind::PromptTooLong,
            format!("Prompt length cannot exceed {} characters", max),
        )
        .with_field("prompt")
    }

    pub fn text_too_long(max: usize) -> Self {
        Self::new(
            ErrorKind::TextTooLong,
            format!("Text length cannot exceed {} characters", max),
        )
        .with_field("text")
    }

    pub fn api_limit_exceeded(limit: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::ApiLimitExceeded,
            format!("API call frequency exceeds limit: {}", limit),
        )
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Keep the kind's code but answer with a different status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Build the envelope for a request path under the given environment.
    pub fn envelope(&self, path: &str, environment: Environment) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.kind.title().to_string(),
            status: self.status.as_u16(),
            message: self.message.clone(),
            code: self.kind.code(),
            field: self.field.clone(),
            details: if environment.exposes_details() {
                self.details.clone()
            } else {
                None
            },
            retry_after: self.retry_after,
            retryable: self.retryable,
            timestamp: chrono::Utc::now().to_rfc3339(),
            path: path.to_string(),
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error: String,
    pub status: u16,
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    pub timestamp: String,
    pub path: String,
}

fn envelope_body(envelope: &ErrorEnvelope) -> Body {
    match serde_json::to_vec(envelope) {
        Ok(bytes) => Body::from(bytes),
        Err(_) => Body::from(r#"{"error":"Internal Server Error","status":500}"#),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Provisional body; render_errors fills in path and details.
        let envelope = self.envelope("", Environment::Production);
        let mut response = Response::new(envelope_body(&envelope));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if let Some(secs) = self.retry_after {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response.extensions_mut().insert(self);
        response
    }
}

/// Outermost middleware: every error response leaves as a complete envelope.
pub async fn render_errors(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    finalize_error(response, &path, state.config.environment)
}

/// Re-render an error response with request-scoped envelope fields.
pub fn finalize_error(response: Response, path: &str, environment: Environment) -> Response {
    let status = response.status();
    let error = match response.extensions().get::<ApiError>() {
        Some(error) => error.clone(),
        None if is_bare_error(&response) => {
            let kind = ErrorKind::from_status(status);
            let message = match status {
                StatusCode::PAYLOAD_TOO_LARGE => "Request body too large".to_string(),
                StatusCode::REQUEST_TIMEOUT => "Request timeout".to_string(),
                _ => status.canonical_reason().unwrap_or("Error").to_string(),
            };
            let status = if status == StatusCode::REQUEST_TIMEOUT {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                status
            };
            ApiError::new(kind, message).with_status(status)
        }
        None => return response,
    };

    let (mut parts, _) = response.into_parts();
    parts.status = error.status;
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts
        .headers
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    let body = envelope_body(&error.envelope(path, environment));
    parts.extensions.insert(error);
    Response::from_parts(parts, body)
}

/// Framework-generated error without a JSON body.
fn is_bare_error(response: &Response) -> bool {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return false;
    }
    !response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Panic handler for `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::internal("Internal server error")
        .with_details(serde_json::json!({ "panic": detail }))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_business_kinds_keep_client_status() {
        assert_eq!(ErrorKind::PromptTooLong.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::ApiLimitExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorKind::TurnstileFailed.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::TurnstileMissing.code(), "TURNSTILE_MISSING");
    }

    #[tokio::test]
    async fn test_details_hidden_in_production() {
        let error = ApiError::validation("bad").with_details(serde_json::json!({"k": 1}));

        let prod = finalize_error(error.clone().into_response(), "/api/x", Environment::Production);
        assert_eq!(prod.headers()[header::CACHE_CONTROL], "no-cache");
        let json = body_json(prod).await;
        assert!(json.get("details").is_none());
        assert_eq!(json["path"], "/api/x");
        assert_eq!(json["code"], "VALIDATION_ERROR");

        let dev = finalize_error(error.into_response(), "/api/x", Environment::Development);
        let json = body_json(dev).await;
        assert_eq!(json["details"]["k"], 1);
    }

    #[tokio::test]
    async fn test_prompt_too_long_names_field() {
        let response = ApiError::prompt_too_long(1000).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "PROMPT_TOO_LONG");
        assert_eq!(json["field"], "prompt");
        assert_eq!(json["status"], 400);
    }

    #[tokio::test]
    async fn test_bare_framework_errors_are_wrapped() {
        let mut bare = Response::new(Body::from("Length Required"));
        *bare.status_mut() = StatusCode::PAYLOAD_TOO_LARGE;
        let wrapped = finalize_error(bare, "/api/speech-to-text", Environment::Production);
        assert_eq!(wrapped.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(wrapped).await;
        assert_eq!(json["message"], "Request body too large");
        assert_eq!(json["code"], "BAD_REQUEST");

        let mut timeout = Response::new(Body::empty());
        *timeout.status_mut() = StatusCode::REQUEST_TIMEOUT;
        let wrapped = finalize_error(timeout, "/api/text-to-text", Environment::Production);
        assert_eq!(wrapped.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_success_untouched() {
        let ok = Response::new(Body::from("fine"));
        let out = finalize_error(ok, "/", Environment::Production);
        assert_eq!(out.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_retry_after_header() {
        let response = ApiError::new(ErrorKind::TooManyRequests, "slow down")
            .with_retry_after(42)
            .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
        let json = body_json(response).await;
        assert_eq!(json["retryAfter"], 42);
        assert_eq!(json["error"], "Too many requests");
    }
}
