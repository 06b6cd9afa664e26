//! Text processing endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::endpoints::guarded;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::upstream::fingerprint;
use crate::validation::{Payload, TextToTextRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToTextResponse {
    pub success: bool,
    pub original_text: String,
    pub processed_text: String,
    pub model: String,
}

/// `POST /api/text-to-text`
pub async fn text_to_text(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<TextToTextResponse>, ApiError> {
    let req = TextToTextRequest::from_payload(payload)?;
    let key = fingerprint(&[
        "text-to-text",
        &req.text,
        &req.model,
        &req.max_tokens.to_string(),
    ]);

    let processed = guarded(&state, &key, state.upstream.process_text(&req)).await?;

    Ok(Json(TextToTextResponse {
        success: true,
        original_text: req.text,
        processed_text: processed,
        model: req.model,
    }))
}
