//! Speech synthesis and transcription endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::endpoints::guarded;
use crate::http::error::ApiError;
use crate::http::response::data_url;
use crate::http::server::AppState;
use crate::upstream::fingerprint;
use crate::validation::{Payload, SpeechToTextRequest, TextToSpeechRequest};

/// Reported for every transcription; the upstream gives no score.
const TRANSCRIPTION_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToSpeechResponse {
    pub success: bool,
    pub audio_data: String,
    pub text: String,
    pub voice: String,
    pub language: String,
    pub speed: f64,
    /// Seconds, estimated from the text length.
    pub estimated_duration: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechToTextResponse {
    pub success: bool,
    pub text: String,
    pub confidence: f64,
    pub language: String,
    pub format: String,
    /// Seconds, estimated from the audio size.
    pub duration: u64,
}

/// `POST /api/text-to-speech`
pub async fn text_to_speech(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<TextToSpeechResponse>, ApiError> {
    let req = TextToSpeechRequest::from_payload(payload)?;
    let key = fingerprint(&["text-to-speech", &req.text, &req.voice]);

    let audio = guarded(&state, &key, state.upstream.synthesize_speech(&req)).await?;

    let estimated_duration = req.estimated_duration_secs();
    Ok(Json(TextToSpeechResponse {
        success: true,
        audio_data: data_url("audio/mpeg", &audio),
        text: req.text,
        voice: req.voice,
        language: req.language,
        speed: req.speed,
        estimated_duration,
    }))
}

/// `POST /api/speech-to-text`
pub async fn speech_to_text(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<SpeechToTextResponse>, ApiError> {
    let req = SpeechToTextRequest::from_payload(payload)?;
    tracing::debug!(
        format = %req.format,
        bytes = req.decoded_bytes,
        estimated_secs = req.estimated_duration_secs,
        "Transcribing audio"
    );

    let text = state
        .upstream
        .transcribe(&req)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SpeechToTextResponse {
        success: true,
        text,
        confidence: TRANSCRIPTION_CONFIDENCE,
        language: req.reported_language().to_string(),
        format: req.format,
        duration: req.estimated_duration_secs,
    }))
}
