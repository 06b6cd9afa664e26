//! Image generation endpoints.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::endpoints::guarded;
use crate::http::error::ApiError;
use crate::http::response::{data_url, image_cache_headers};
use crate::http::server::AppState;
use crate::upstream::fingerprint;
use crate::validation::{ImageToImageRequest, Payload, TextToImageRequest};

const JPEG: &str = "image/jpeg";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToImageResponse {
    pub success: bool,
    pub image_data: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub model: String,
    pub seed: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageToImageResponse {
    pub success: bool,
    pub image_data: String,
    pub prompt: String,
    pub seed: u32,
}

/// `POST /api/text-to-image`
pub async fn text_to_image(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let req = TextToImageRequest::from_payload(payload)?;
    // Seeds are left out: a failing prompt fails for any seed.
    let key = fingerprint(&[
        "text-to-image",
        &req.prompt,
        &req.width.to_string(),
        &req.height.to_string(),
        &req.model,
    ]);

    let image = guarded(&state, &key, state.upstream.text_to_image(&req)).await?;

    let body = TextToImageResponse {
        success: true,
        image_data: data_url(JPEG, &image),
        prompt: req.prompt,
        width: req.width,
        height: req.height,
        model: req.model,
        seed: req.seed,
    };
    Ok((image_cache_headers(&key), Json(body)).into_response())
}

/// `POST /api/image-to-image`
pub async fn image_to_image(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let req = ImageToImageRequest::from_payload(payload)?;
    let key = fingerprint(&[
        "image-to-image",
        &req.prompt,
        req.image_url.as_str(),
        &req.strength.to_string(),
    ]);

    let image = guarded(&state, &key, state.upstream.image_to_image(&req)).await?;

    let body = ImageToImageResponse {
        success: true,
        image_data: data_url(JPEG, &image),
        prompt: req.prompt,
        seed: req.seed,
    };
    Ok((image_cache_headers(&key), Json(body)).into_response())
}
