//! HTTP client for the generative API (Pollinations).
//!
//! # Responsibilities
//! - Build upstream URLs from validated requests
//! - Enforce the per-kind deadline around send + body read
//! - Translate upstream failures into the gateway error taxonomy
//!
//! Upstream statuses are never forwarded verbatim.

use std::fmt;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::StatusCode;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::error::{ApiError, ErrorKind};
use crate::observability::metrics;
use crate::resilience::with_deadline;
use crate::validation::{
    ImageToImageRequest, SpeechToTextRequest, TextToImageRequest, TextToSpeechRequest,
    TextToTextRequest,
};

const TEXT_INSTRUCTION: &str = "Please process the following text:";
const PROMPT_MODEL: &str = "openai";
const PROMPT_MAX_TOKENS: &str = "100";
const SPEECH_MODEL: &str = "openai-audio";
const TRANSCRIPTION_INSTRUCTION: &str = "Transcribe this audio";

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped, so control
/// characters in user text survive as `%0A`, `%09` and so on.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Upstream capability, used for deadlines, messages and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Image,
    Text,
    Speech,
    Transcription,
}

impl Service {
    pub fn label(self) -> &'static str {
        match self {
            Service::Image => "image",
            Service::Text => "text",
            Service::Speech => "speech",
            Service::Transcription => "transcription",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Service::Image => "Image generation",
            Service::Text => "Text processing",
            Service::Speech => "Speech synthesis",
            Service::Transcription => "Speech recognition",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} service timed out after {after:?}")]
    Timeout { service: Service, after: Duration },

    #[error("{service} service unreachable: {source}")]
    Transport {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} service returned {status}")]
    Status { service: Service, status: StatusCode },

    #[error("{service} service returned an unusable body: {reason}")]
    InvalidBody { service: Service, reason: String },
}

impl UpstreamError {
    pub fn service(&self) -> Service {
        match self {
            UpstreamError::Timeout { service, .. }
            | UpstreamError::Transport { service, .. }
            | UpstreamError::Status { service, .. }
            | UpstreamError::InvalidBody { service, .. } => *service,
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        let service = err.service();
        let details = json!({ "upstream": err.to_string() });
        let api = match &err {
            UpstreamError::Timeout { .. } => ApiError::new(
                ErrorKind::GatewayTimeout,
                format!("{} service timed out, please try again", service),
            )
            .with_retryable(true),
            UpstreamError::Transport { .. } => ApiError::new(
                ErrorKind::BadGateway,
                format!("{} service is unreachable", service),
            )
            .with_retryable(true),
            UpstreamError::Status { status, .. }
                if *status == StatusCode::PAYMENT_REQUIRED
                    || *status == StatusCode::TOO_MANY_REQUESTS =>
            {
                ApiError::api_limit_exceeded(format!("upstream answered {}", status.as_u16()))
            }
            UpstreamError::Status { status, .. } if *status == StatusCode::SERVICE_UNAVAILABLE => {
                ApiError::new(
                    ErrorKind::ServiceUnavailable,
                    format!("{} service is temporarily unavailable", service),
                )
                .with_retryable(true)
            }
            UpstreamError::Status { status, .. } => ApiError::internal(format!(
                "{} service is temporarily unavailable ({})",
                service,
                status.as_u16()
            )),
            UpstreamError::InvalidBody { .. } => ApiError::new(
                ErrorKind::BadGateway,
                format!("{} service returned an invalid response", service),
            ),
        };
        api.with_details(details)
    }
}

#[derive(Debug, Error)]
pub enum ClientSetupError {
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
    #[error("upstream url cannot carry path segments: {0}")]
    NotABase(String),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result of a single liveness probe.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub healthy: bool,
    pub elapsed: Duration,
    pub error: Option<String>,
}

pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
    image_base: Url,
    text_base: Url,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientSetupError> {
        let image_base = parse_base(&config.image_base_url)?;
        let text_base = parse_base(&config.text_base_url)?;
        let client = Client::builder()
            .user_agent(concat!("genai-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
            image_base,
            text_base,
        })
    }

    fn deadline(&self, service: Service) -> Duration {
        let secs = match service {
            Service::Image => self.config.image_timeout_secs,
            Service::Text => self.config.text_timeout_secs,
            Service::Speech => self.config.speech_timeout_secs,
            Service::Transcription => self.config.transcription_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    /// `{image}/prompt/{prompt}?...` for a text-to-image request.
    pub fn text_to_image_url(&self, req: &TextToImageRequest) -> Url {
        let mut url = join(&self.image_base, &["prompt", &req.prompt]);
        url.query_pairs_mut()
            .append_pair("width", &req.width.to_string())
            .append_pair("height", &req.height.to_string())
            .append_pair("model", &req.model)
            .append_pair("seed", &req.seed.to_string())
            .append_pair("nologo", "true")
            .append_pair("safe", "true")
            .append_pair("private", "true");
        url
    }

    /// Same endpoint with the `kontext` model and a reference image.
    pub fn image_to_image_url(&self, req: &ImageToImageRequest) -> Url {
        let mut url = join(&self.image_base, &["prompt", &req.prompt]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", "kontext")
                .append_pair("image", req.image_url.as_str())
                .append_pair("nologo", "true")
                .append_pair("safe", "true")
                .append_pair("private", "true")
                .append_pair("strength", &req.strength.to_string());
            if let Some(width) = req.width {
                query.append_pair("width", &width.to_string());
            }
            if let Some(height) = req.height {
                query.append_pair("height", &height.to_string());
            }
            query.append_pair("seed", &req.seed.to_string());
        }
        url
    }

    pub fn text_url(&self, req: &TextToTextRequest) -> Url {
        let prompt = format!("{}\n\n{}", TEXT_INSTRUCTION, req.text);
        let mut url = join(&self.text_base, &[&prompt]);
        url.query_pairs_mut()
            .append_pair("model", &req.model)
            .append_pair("max_tokens", &req.max_tokens.to_string());
        url
    }

    pub fn speech_url(&self, req: &TextToSpeechRequest) -> Url {
        let mut url = join(&self.text_base, &[&req.text]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", SPEECH_MODEL)
                .append_pair("voice", &req.voice);
            if let Some(token) = non_blank(&self.config.api_token) {
                query.append_pair("token", token);
            } else if let Some(referrer) = non_blank(&self.config.referrer) {
                query.append_pair("referrer", referrer);
            }
        }
        url
    }

    pub fn prompt_url(&self, instruction: &str, input: &str) -> Url {
        let prompt = format!("{}\n\n{}", instruction, input);
        let mut url = join(&self.text_base, &[&prompt]);
        url.query_pairs_mut()
            .append_pair("model", PROMPT_MODEL)
            .append_pair("max_tokens", PROMPT_MAX_TOKENS);
        url
    }

    pub async fn text_to_image(&self, req: &TextToImageRequest) -> Result<Bytes, UpstreamError> {
        let request = self
            .client
            .get(self.text_to_image_url(req))
            .header(ACCEPT, "image/jpeg");
        self.execute(Service::Image, request).await
    }

    pub async fn image_to_image(&self, req: &ImageToImageRequest) -> Result<Bytes, UpstreamError> {
        let request = self
            .client
            .get(self.image_to_image_url(req))
            .header(ACCEPT, "image/jpeg");
        self.execute(Service::Image, request).await
    }

    /// Processed text, trimmed.
    pub async fn process_text(&self, req: &TextToTextRequest) -> Result<String, UpstreamError> {
        let request = self.client.get(self.text_url(req)).header(ACCEPT, "text/plain");
        let body = self.execute(Service::Text, request).await?;
        utf8(Service::Text, body).map(|text| text.trim().to_string())
    }

    /// MP3 audio for the given text.
    pub async fn synthesize_speech(&self, req: &TextToSpeechRequest) -> Result<Bytes, UpstreamError> {
        let request = self.client.get(self.speech_url(req)).header(ACCEPT, "audio/mpeg");
        self.execute(Service::Speech, request).await
    }

    /// Transcribed text from `choices[0].message.content`.
    pub async fn transcribe(&self, req: &SpeechToTextRequest) -> Result<String, UpstreamError> {
        let url = join(&self.text_base, &["openai"]);
        let payload = json!({
            "model": SPEECH_MODEL,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": TRANSCRIPTION_INSTRUCTION },
                    {
                        "type": "input_audio",
                        "input_audio": { "data": req.audio_base64, "format": req.format }
                    }
                ]
            }]
        });
        let mut request = self.client.post(url).json(&payload);
        if let Some(token) = non_blank(&self.config.api_token) {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = self.execute(Service::Transcription, request).await?;
        let value: Value = serde_json::from_slice(&body).map_err(|e| UpstreamError::InvalidBody {
            service: Service::Transcription,
            reason: e.to_string(),
        })?;
        value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::InvalidBody {
                service: Service::Transcription,
                reason: "no transcription in response".to_string(),
            })
    }

    /// Short completion used by the prompt helpers; empty output is an error.
    pub async fn complete_prompt(&self, instruction: &str, input: &str) -> Result<String, UpstreamError> {
        let request = self
            .client
            .get(self.prompt_url(instruction, input))
            .header(ACCEPT, "text/plain");
        let body = self.execute(Service::Text, request).await?;
        let text = utf8(Service::Text, body)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(UpstreamError::InvalidBody {
                service: Service::Text,
                reason: "empty completion".to_string(),
            });
        }
        Ok(text.to_string())
    }

    /// Probe targets for the health report, in report order.
    pub fn probe_targets(&self) -> [(Service, Url); 4] {
        [
            (Service::Image, self.image_base.clone()),
            (Service::Text, self.text_base.clone()),
            (Service::Speech, join(&self.text_base, &["tts"])),
            (Service::Transcription, join(&self.text_base, &["openai"])),
        ]
    }

    pub fn image_probe_target(&self) -> Url {
        self.image_base.clone()
    }

    /// HEAD the target; any 2xx within the deadline counts as healthy.
    pub async fn probe(&self, target: Url, deadline: Duration) -> ProbeResult {
        let started = Instant::now();
        let outcome = with_deadline(deadline, self.client.head(target).send()).await;
        let elapsed = started.elapsed();
        match outcome {
            Ok(Ok(response)) if response.status().is_success() => ProbeResult {
                healthy: true,
                elapsed,
                error: None,
            },
            Ok(Ok(response)) => ProbeResult {
                healthy: false,
                elapsed,
                error: Some(format!("status {}", response.status().as_u16())),
            },
            Ok(Err(e)) => ProbeResult {
                healthy: false,
                elapsed,
                error: Some(e.to_string()),
            },
            Err(e) => ProbeResult {
                healthy: false,
                elapsed,
                error: Some(e.to_string()),
            },
        }
    }

    /// Send, check status and read the body, all under the service deadline.
    async fn execute(&self, service: Service, request: RequestBuilder) -> Result<Bytes, UpstreamError> {
        let deadline = self.deadline(service);
        let result = with_deadline(deadline, async {
            let response = request.send().await.map_err(|source| transport(service, deadline, source))?;
            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Status { service, status });
            }
            response
                .bytes()
                .await
                .map_err(|source| transport(service, deadline, source))
        })
        .await;

        let result = match result {
            Ok(inner) => inner,
            Err(_) => Err(UpstreamError::Timeout {
                service,
                after: deadline,
            }),
        };

        if let Err(err) = &result {
            metrics::record_upstream_failure(service.label());
            tracing::warn!(service = service.label(), error = %err, "Upstream call failed");
        }
        result
    }
}

fn transport(service: Service, deadline: Duration, source: reqwest::Error) -> UpstreamError {
    if source.is_timeout() {
        UpstreamError::Timeout {
            service,
            after: deadline,
        }
    } else {
        UpstreamError::Transport { service, source }
    }
}

fn utf8(service: Service, body: Bytes) -> Result<String, UpstreamError> {
    String::from_utf8(body.to_vec()).map_err(|e| UpstreamError::InvalidBody {
        service,
        reason: e.to_string(),
    })
}

fn parse_base(raw: &str) -> Result<Url, ClientSetupError> {
    let url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(ClientSetupError::NotABase(raw.to_string()));
    }
    Ok(url)
}

/// Append path segments to a base URL, each escaped as a URI component.
///
/// `path_segments_mut` would drop tabs and newlines, so segments are encoded
/// up front and the path is set in one go.
fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    let mut path = base.path().trim_end_matches('/').to_string();
    for segment in segments {
        path.push('/');
        path.extend(utf8_percent_encode(segment, COMPONENT));
    }
    url.set_path(&path);
    url
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
