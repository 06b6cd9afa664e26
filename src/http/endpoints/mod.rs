//! Route handlers.
//!
//! Gated handlers only ever see requests that already passed the rate
//! limiter and the verification gate. Each one validates into a typed
//! request, calls the upstream, and shapes the JSON response.

pub mod health;
pub mod image;
pub mod prompt;
pub mod speech;
pub mod text;
pub mod verification;

use std::future::Future;

use axum::http::Uri;

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::upstream::UpstreamError;

/// Run an upstream call unless its fingerprint failed recently; remember new failures.
pub(crate) async fn guarded<T, F>(state: &AppState, fingerprint: &str, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    state.error_cache.check(fingerprint)?;
    call.await.map_err(|err| {
        state.error_cache.record(fingerprint, err.to_string());
        ApiError::from(err)
    })
}

/// Router fallback: unknown paths get the JSON envelope too.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
