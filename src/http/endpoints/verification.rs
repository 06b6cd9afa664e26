//! `POST /api/test-turnstile`: check a token without calling any upstream.

use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::http::error::{ApiError, ErrorKind};
use crate::http::server::AppState;
use crate::security::client_ip::ClientIdentity;
use crate::security::turnstile::{extract_token, VerificationContext, INTERNAL_ERROR};
use crate::security::VerificationOutcome;
use crate::validation::payload::malformed_body;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestTurnstileResponse {
    pub success: bool,
    pub verification: VerificationOutcome,
    pub message: &'static str,
    #[serde(rename = "clientIP")]
    pub client_ip: String,
    pub timestamp: String,
}

pub async fn test_turnstile(
    State(state): State<AppState>,
    identity: ClientIdentity,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TestTurnstileResponse>, ApiError> {
    let parsed: Value = serde_json::from_slice(&body).map_err(|e| malformed_body(&e))?;

    let Some(token) = extract_token(&parsed) else {
        return Err(ApiError::new(
            ErrorKind::TurnstileMissing,
            "Please complete the verification challenge",
        ));
    };

    let url = uri.to_string();
    let ctx = VerificationContext::new(&identity, &headers, &url);
    let outcome = state.gate.verify_and_record(token, ctx).await;

    if outcome.error_codes.iter().any(|c| c == INTERNAL_ERROR) {
        return Err(ApiError::new(ErrorKind::TurnstileServiceError, outcome.message())
            .with_details(serde_json::json!(outcome.error_codes))
            .with_retryable(true));
    }

    let message = if outcome.success {
        "Turnstile verification successful"
    } else {
        "Turnstile verification failed"
    };

    Ok(Json(TestTurnstileResponse {
        success: outcome.success,
        verification: outcome,
        message,
        client_ip: identity.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
