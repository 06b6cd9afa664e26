//! Prompt helper endpoints.
//!
//! Both degrade instead of failing: when the upstream is unavailable the
//! caller still gets a usable prompt.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::validation::{ImagePromptRequest, OptimizePromptRequest, Payload, PromptDimensions};

const IMAGE_PROMPT_INSTRUCTION: &str = "Please create a detailed and creative image generation prompt that is suitable for artificial intelligence image generation, with no more than 1000 characters, based on the following elements:";
const OPTIMIZE_INSTRUCTION: &str = "Please create a detailed and creative image generation prompt that is suitable for artificial intelligence image generation, with no more than 500 characters, based on the following user input:";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePromptResponse {
    pub success: bool,
    pub prompt: String,
    pub base_prompt: String,
    pub dimensions: PromptDimensions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizePromptResponse {
    pub success: bool,
    pub optimized_prompt: String,
}

/// `POST /api/generate-image-prompt`
pub async fn generate_image_prompt(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<ImagePromptResponse>, ApiError> {
    let req = ImagePromptRequest::from_payload(payload)?;
    let base_prompt = req.dimensions.base_prompt();

    let prompt = match state
        .upstream
        .complete_prompt(IMAGE_PROMPT_INSTRUCTION, &base_prompt)
        .await
    {
        Ok(prompt) => prompt,
        Err(e) => {
            tracing::warn!(error = %e, "Prompt generation failed, using base prompt");
            base_prompt.clone()
        }
    };

    Ok(Json(ImagePromptResponse {
        success: true,
        prompt,
        base_prompt,
        dimensions: req.dimensions,
    }))
}

/// `POST /api/text-to-image/optimize-prompt`
pub async fn optimize_prompt(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<OptimizePromptResponse>, ApiError> {
    let req = OptimizePromptRequest::from_payload(payload)?;

    let optimized_prompt = match state
        .upstream
        .complete_prompt(OPTIMIZE_INSTRUCTION, &req.prompt)
        .await
    {
        Ok(prompt) => prompt,
        Err(e) => {
            tracing::warn!(error = %e, "Prompt optimization failed, returning input");
            req.prompt
        }
    };

    Ok(Json(OptimizePromptResponse {
        success: true,
        optimized_prompt,
    }))
}
