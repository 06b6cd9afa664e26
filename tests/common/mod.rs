//! Shared utilities for integration testing.
//!
//! Every server binds `127.0.0.1:0`, so tests run in parallel without
//! fighting over ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use genai_gateway::config::{Environment, GatewayConfig};
use genai_gateway::http::AppState;
use genai_gateway::{HttpServer, Shutdown};

pub const VALID_TOKEN: &str = "valid-token";
pub const FLAKY_TOKEN: &str = "service-down";
pub const IMAGE_BYTES: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";
pub const AUDIO_BYTES: &[u8] = b"ID3fake-mp3";
/// `data:` URL accepted by the transcription validator.
pub const SAMPLE_AUDIO: &str = "data:audio/mpeg;base64,SUQzBAAAAAAA";

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Knobs and counters shared with the mock generative API.
#[derive(Default)]
pub struct UpstreamControl {
    /// Non-zero forces every image call to answer with this status.
    pub image_status: AtomicU16,
    pub text_status: AtomicU16,
    /// Milliseconds to stall before answering image calls.
    pub image_delay_ms: AtomicU16,
    pub image_hits: AtomicUsize,
    pub text_hits: AtomicUsize,
    pub transcription_hits: AtomicUsize,
}

impl UpstreamControl {
    pub fn fail_images(&self, status: u16) {
        self.image_status.store(status, Ordering::SeqCst);
    }

    pub fn fail_text(&self, status: u16) {
        self.text_status.store(status, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.image_status.store(0, Ordering::SeqCst);
        self.text_status.store(0, Ordering::SeqCst);
    }
}

fn forced(status: &AtomicU16) -> Option<StatusCode> {
    match status.load(Ordering::SeqCst) {
        0 => None,
        code => StatusCode::from_u16(code).ok(),
    }
}

async fn image(State(ctl): State<Arc<UpstreamControl>>, Path(_prompt): Path<String>) -> Response {
    ctl.image_hits.fetch_add(1, Ordering::SeqCst);
    let delay = ctl.image_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay.into())).await;
    }
    if let Some(status) = forced(&ctl.image_status) {
        return (status, "upstream failure").into_response();
    }
    IMAGE_BYTES.into_response()
}

async fn text(
    State(ctl): State<Arc<UpstreamControl>>,
    Path(prompt): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    ctl.text_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = forced(&ctl.text_status) {
        return (status, "upstream failure").into_response();
    }
    match query.get("model").map(String::as_str) {
        Some("openai-audio") => AUDIO_BYTES.into_response(),
        _ if prompt.contains("image generation prompt") => {
            "A vivid, detailed scene".into_response()
        }
        _ => {
            let input = prompt.rsplit("\n\n").next().unwrap_or_default().to_string();
            format!("  processed: {}  ", input).into_response()
        }
    }
}

async fn transcribe(State(ctl): State<Arc<UpstreamControl>>, _body: Bytes) -> Response {
    ctl.transcription_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = forced(&ctl.text_status) {
        return (status, "upstream failure").into_response();
    }
    Json(json!({ "choices": [{ "message": { "content": " hello world " } }] })).into_response()
}

/// Mock generative API: images under `/image/`, text and speech under `/text/`.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub control: Arc<UpstreamControl>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let control = Arc::new(UpstreamControl::default());
        let router = Router::new()
            .route("/image/", get(|| async { "ok" }))
            .route("/image/prompt/{*prompt}", get(image))
            .route("/text/", get(|| async { "ok" }))
            .route("/text/tts", get(|| async { "ok" }))
            .route("/text/openai", get(|| async { "ok" }).post(transcribe))
            .route("/text/{*prompt}", get(text))
            .with_state(control.clone());
        let addr = serve(router).await;
        Self { addr, control }
    }

    pub fn image_base(&self) -> String {
        format!("http://{}/image/", self.addr)
    }

    pub fn text_base(&self) -> String {
        format!("http://{}/text/", self.addr)
    }
}

/// Siteverify stand-in: accepts [`VALID_TOKEN`], reports an internal error
/// for [`FLAKY_TOKEN`], rejects everything else.
pub async fn start_siteverify() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/siteverify",
        post(move |Form(form): Form<HashMap<String, String>>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let reply: Value = match form.get("response").map(String::as_str) {
                    Some(VALID_TOKEN) => json!({
                        "success": true,
                        "hostname": "localhost",
                        "challenge_ts": "2024-01-01T00:00:00Z",
                        "action": "generate"
                    }),
                    Some(FLAKY_TOKEN) => json!({ "success": false, "error-codes": ["internal-error"] }),
                    _ => json!({ "success": false, "error-codes": ["invalid-input-response"] }),
                };
                Json(reply)
            }
        }),
    );
    let addr = serve(router).await;
    (format!("http://{}/siteverify", addr), hits)
}

/// Config wired to the mocks, with verification enforced.
pub fn gateway_config(upstream: &MockUpstream, verify_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.environment = Environment::Development;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.turnstile.secret_key = Some("test-secret".to_string());
    config.turnstile.site_key = Some("test-site".to_string());
    config.turnstile.verify_url = verify_url.to_string();
    config.turnstile.timeout_secs = 2;
    config.upstream.image_base_url = upstream.image_base();
    config.upstream.text_base_url = upstream.text_base();
    config.upstream.image_timeout_secs = 1;
    config.upstream.text_timeout_secs = 2;
    config.upstream.speech_timeout_secs = 2;
    config.upstream.transcription_timeout_secs = 2;
    config.upstream.health_timeout_secs = 1;
    config.upstream.health_quick_timeout_secs = 1;
    config.observability.metrics_enabled = false;
    config
}

/// A gateway running over real HTTP.
pub struct RunningGateway {
    pub base_url: String,
    pub state: AppState,
    pub shutdown: Shutdown,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_gateway(config: GatewayConfig) -> RunningGateway {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let state = server.state().clone();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    RunningGateway {
        base_url: format!("http://{}", addr),
        state,
        shutdown,
    }
}

/// POST JSON with a fixed client address.
pub async fn post_json(url: &str, ip: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .header("x-forwarded-for", ip)
        .json(&body)
        .send()
        .await
        .unwrap()
}
