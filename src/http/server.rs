//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared [`AppState`] from configuration
//! - Create the Axum router: gated generation routes, open routes, fallback
//! - Wire up middleware (request id, tracing, logging, headers, errors, limits)
//! - Serve on a listener until shutdown is signalled
//!
//! # Layering
//! ```text
//! set request id → trace → propagate id → record_requests → security headers
//!     → render_errors → catch panic → timeout → body limits
//!     → [gated routes: rate limit → turnstile] → handler
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::health::HealthMonitor;
use crate::http::endpoints::{self, health, image, prompt, speech, text, verification};
use crate::http::error::{panic_response, render_errors};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::request_log::record_requests;
use crate::observability::RequestLog;
use crate::security::headers::apply_security_headers;
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::turnstile::turnstile_middleware;
use crate::security::{Clock, FixedWindowRateLimiter, SystemClock, TurnstileGate};
use crate::upstream::client::ClientSetupError;
use crate::upstream::{ErrorCache, UpstreamClient};

/// Failure to assemble the application state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build verification client: {0}")]
    Turnstile(#[source] reqwest::Error),

    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] ClientSetupError),
}

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub limiter: Arc<FixedWindowRateLimiter>,
    pub gate: Arc<TurnstileGate>,
    pub upstream: Arc<UpstreamClient>,
    pub error_cache: Arc<ErrorCache>,
    pub health: Arc<HealthMonitor>,
    pub request_log: Arc<RequestLog>,
}

impl AppState {
    pub fn new(config: GatewayConfig, clock: Arc<dyn Clock>) -> Result<Self, StartupError> {
        let limiter = FixedWindowRateLimiter::from_config(&config.rate_limit, clock);
        let gate = TurnstileGate::new(&config.turnstile).map_err(StartupError::Turnstile)?;
        let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);
        let health = HealthMonitor::new(upstream.clone(), &config.upstream);
        let error_cache = ErrorCache::from_config(&config.error_cache);
        let request_log = RequestLog::new(config.observability.request_log_capacity);

        Ok(Self {
            config: Arc::new(config),
            limiter: Arc::new(limiter),
            gate: Arc::new(gate),
            upstream,
            error_cache: Arc::new(error_cache),
            health: Arc::new(health),
            request_log: Arc::new(request_log),
        })
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`HttpServer::new`] with an explicit limiter clock.
    pub fn with_clock(config: GatewayConfig, clock: Arc<dyn Clock>) -> Result<Self, StartupError> {
        Ok(Self::from_state(AppState::new(config, clock)?))
    }

    pub fn from_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        // route_layer: the last one added runs first.
        let gated = Router::new()
            .route("/api/text-to-image", post(image::text_to_image))
            .route("/api/image-to-image", post(image::image_to_image))
            .route("/api/text-to-text", post(text::text_to_text))
            .route("/api/text-to-speech", post(speech::text_to_speech))
            .route("/api/speech-to-text", post(speech::speech_to_text))
            .route("/api/generate-image-prompt", post(prompt::generate_image_prompt))
            .route("/api/text-to-image/optimize-prompt", post(prompt::optimize_prompt))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                turnstile_middleware,
            ))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ));

        let open = Router::new()
            .route(
                "/api/health",
                get(health::health_report).head(health::health_head),
            )
            .route("/api/test-turnstile", post(verification::test_turnstile));

        let app = gated
            .merge(open)
            .fallback(endpoints::not_found)
            .with_state(state.clone())
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(state.clone(), render_errors));

        let app = if config.security.enable_headers {
            apply_security_headers(app, config.environment)
        } else {
            app
        };

        app.layer(middleware::from_fn_with_state(state, record_requests))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = ?self.state.config.environment,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::security::ManualClock;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.environment = Environment::Development;
        config.turnstile.skip = true;
        config.rate_limit.max_requests = 2;
        config.rate_limit.window_ms = 60_000;
        // Nothing listens here; tests below never reach the upstream.
        config.upstream.image_base_url = "http://127.0.0.1:9/".to_string();
        config.upstream.text_base_url = "http://127.0.0.1:9/".to_string();
        config
    }

    /// Gate enforced; no siteverify call is ever reached by these tests.
    fn gated_config() -> GatewayConfig {
        let mut config = test_config();
        config.turnstile.skip = false;
        config.turnstile.secret_key = Some("secret".into());
        config.turnstile.site_key = Some("site".into());
        config
    }

    fn server(config: GatewayConfig) -> HttpServer {
        HttpServer::with_clock(config, Arc::new(ManualClock::new(1_000))).unwrap()
    }

    fn post_json(path: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_route_gets_envelope() {
        let app = server(test_config()).router();
        let response = app
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-response-time"));
        let body = json_body(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["path"], "/api/nope");
    }

    #[tokio::test]
    async fn test_validation_error_carries_field() {
        let app = server(test_config()).router();
        let response = app
            .oneshot(post_json("/api/text-to-image", json!({ "width": 512 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], 400);
        assert_eq!(body["path"], "/api/text-to-image");
        assert!(body["field"].is_string());
    }

    #[tokio::test]
    async fn test_rate_limit_applies_before_validation() {
        let app = server(test_config()).router();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/api/text-to-image", json!({})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        }

        let response = app
            .oneshot(post_json("/api/text-to-image", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let body = json_body(response).await;
        assert_eq!(body["code"], "TOO_MANY_REQUESTS");
        assert_eq!(body["retryAfter"], 60);
    }

    #[tokio::test]
    async fn test_missing_token_rejected_when_gate_active() {
        let app = server(gated_config()).router();

        let response = app
            .oneshot(post_json("/api/text-to-text", json!({ "text": "hello" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "TURNSTILE_MISSING");
    }

    #[tokio::test]
    async fn test_malformed_body_has_same_shape_with_or_without_gate() {
        for config in [gated_config(), test_config()] {
            let app = server(config).router();
            let request = Request::post("/api/text-to-text")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap();

            let response = app.oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = json_body(response).await;
            assert_eq!(body["code"], "VALIDATION_ERROR");
            assert_eq!(body["field"], "body");
            assert_eq!(body["message"], "Invalid request body format");
        }
    }

    #[tokio::test]
    async fn test_broken_body_stream_is_bad_request() {
        let app = server(gated_config()).router();
        let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
            Ok("{\"text\":"),
            Err(std::io::Error::other("client went away")),
        ];
        let request = Request::post("/api/text-to-text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_ne!(body["message"], "Request body too large");
    }

    #[tokio::test]
    async fn test_streamed_oversized_body_rejected_by_gate() {
        let mut config = gated_config();
        config.security.max_body_size = 64;
        let app = server(config).router();
        let chunks: Vec<Result<String, std::io::Error>> =
            vec![Ok(format!("{{\"text\":\"{}\"}}", "x".repeat(500)))];
        let request = Request::post("/api/text-to-text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_test_turnstile_records_verification() {
        // No secret configured: verification fails closed without the network.
        let app = server(test_config()).router();
        let (_guard, logs) = crate::observability::logging::capture_logs();

        let response = app
            .oneshot(post_json("/api/test-turnstile", json!({ "turnstileToken": "tok" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);

        let logs = logs.contents();
        assert!(logs.contains("verification_failed"));
        assert!(logs.contains("203.0.113.7"));
        assert!(logs.contains("/api/test-turnstile"));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = test_config();
        config.security.max_body_size = 64;
        let app = server(config).router();

        let response = app
            .oneshot(post_json(
                "/api/text-to-text",
                json!({ "text": "x".repeat(500) }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let app = server(test_config()).router();
        let response = app
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_test_turnstile_without_token() {
        let app = server(test_config()).router();
        let response = app
            .oneshot(post_json("/api/test-turnstile", json!({ "other": 1 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "TURNSTILE_MISSING");
    }

    #[tokio::test]
    async fn test_requests_are_logged() {
        let server = server(test_config());
        let app = server.router();
        app.oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let entries = server.state().request_log.recent(10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, 404);
        assert_eq!(entries[0].path, "/api/nope");
    }
}
