use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{ErrorBody, SdkError};
use crate::types::*;

/// Body field the gateway reads the verification token from.
const TOKEN_FIELD: &str = "turnstileToken";

pub struct GatewayClient {
    client: Client,
    base_url: String,
    turnstile_token: Option<String>,
    admin_key: Option<String>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            turnstile_token: None,
            admin_key: None,
        }
    }

    /// Token attached to every gated call.
    pub fn with_turnstile_token(mut self, token: impl Into<String>) -> Self {
        self.turnstile_token = Some(token.into());
        self
    }

    /// Bearer key for the admin API (usually a different base URL).
    pub fn with_admin_key(mut self, key: impl Into<String>) -> Self {
        self.admin_key = Some(key.into());
        self
    }

    pub async fn text_to_image(&self, req: &TextToImage) -> Result<TextToImageResponse, SdkError> {
        self.post_gated("/api/text-to-image", req).await
    }

    pub async fn image_to_image(&self, req: &ImageToImage) -> Result<ImageToImageResponse, SdkError> {
        self.post_gated("/api/image-to-image", req).await
    }

    pub async fn text_to_text(&self, req: &TextToText) -> Result<TextToTextResponse, SdkError> {
        self.post_gated("/api/text-to-text", req).await
    }

    pub async fn text_to_speech(&self, req: &TextToSpeech) -> Result<TextToSpeechResponse, SdkError> {
        self.post_gated("/api/text-to-speech", req).await
    }

    pub async fn speech_to_text(&self, req: &SpeechToText) -> Result<SpeechToTextResponse, SdkError> {
        self.post_gated("/api/speech-to-text", req).await
    }

    pub async fn generate_image_prompt(&self, req: &ImagePrompt) -> Result<ImagePromptResponse, SdkError> {
        self.post_gated("/api/generate-image-prompt", req).await
    }

    pub async fn optimize_prompt(&self, prompt: &str) -> Result<OptimizePromptResponse, SdkError> {
        self.post_gated(
            "/api/text-to-image/optimize-prompt",
            &serde_json::json!({ "prompt": prompt }),
        )
        .await
    }

    /// Full probe report; returned for both healthy and degraded gateways.
    pub async fn health(&self) -> Result<HealthReport, SdkError> {
        let resp = self.client.get(self.url("/api/health")).send().await?;
        decode(resp).await
    }

    /// Quick liveness check via `HEAD /api/health`.
    pub async fn is_up(&self) -> Result<bool, SdkError> {
        let resp = self.client.head(self.url("/api/health")).send().await?;
        Ok(resp.status() == StatusCode::OK)
    }

    pub async fn test_turnstile(&self, token: &str) -> Result<TurnstileCheck, SdkError> {
        let resp = self
            .client
            .post(self.url("/api/test-turnstile"))
            .json(&serde_json::json!({ TOKEN_FIELD: token }))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn admin_status(&self) -> Result<Value, SdkError> {
        self.admin_get("/admin/status").await
    }

    pub async fn admin_limiter(&self) -> Result<Value, SdkError> {
        self.admin_get("/admin/limiter").await
    }

    pub async fn admin_stats(&self) -> Result<Value, SdkError> {
        self.admin_get("/admin/stats").await
    }

    pub async fn admin_logs(&self, ip: Option<&str>, limit: Option<usize>) -> Result<Value, SdkError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(ip) = ip {
            query.push(("ip", ip.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let resp = self
            .admin(self.client.get(self.url("/admin/logs")).query(&query))
            .send()
            .await?;
        decode(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_gated<B, T>(&self, path: &str, body: &B) -> Result<T, SdkError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let mut body = serde_json::to_value(body)?;
        if let (Some(token), Value::Object(fields)) = (&self.turnstile_token, &mut body) {
            fields.insert(TOKEN_FIELD.to_string(), Value::String(token.clone()));
        }
        let resp = self.client.post(self.url(path)).json(&body).send().await?;
        decode(resp).await
    }

    async fn admin_get(&self, path: &str) -> Result<Value, SdkError> {
        let resp = self.admin(self.client.get(self.url(path))).send().await?;
        decode(resp).await
    }

    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.admin_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

/// Success bodies decode into `T`; everything else into the error envelope.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SdkError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;

    // The health report is a valid answer even when it comes back 503.
    if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
        if let Ok(value) = serde_json::from_slice::<T>(&bytes) {
            return Ok(value);
        }
    }
    if !status.is_success() {
        let body = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| ErrorBody {
            status: status.as_u16(),
            message: String::from_utf8_lossy(&bytes).into_owned(),
            ..Default::default()
        });
        return Err(SdkError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_slice(&bytes)?)
}
