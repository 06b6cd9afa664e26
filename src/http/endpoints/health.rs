//! `GET` / `HEAD /api/health`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::response::no_store_headers;
use crate::http::server::AppState;

pub async fn health_report(State(state): State<AppState>) -> Response {
    let report = state.health.report().await;
    (no_store_headers(), Json(report)).into_response()
}

pub async fn health_head(State(state): State<AppState>) -> StatusCode {
    if state.health.quick_check().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
