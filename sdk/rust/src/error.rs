use serde::Deserialize;
use thiserror::Error;

/// Error envelope returned by the gateway for every failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
    pub message: String,
    pub code: String,
    pub field: Option<String>,
    pub details: Option<serde_json::Value>,
    pub retry_after: Option<u64>,
    pub retryable: Option<bool>,
    pub timestamp: String,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned {status} {}: {}", .body.code, .body.message)]
    Api { status: u16, body: ErrorBody },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SdkError {
    /// Envelope code such as `TOO_MANY_REQUESTS`, when the gateway sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            SdkError::Api { body, .. } => Some(body.code.as_str()),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            SdkError::Http(e) => e.status().map(|s| s.as_u16()),
            SdkError::Decode(_) => None,
        }
    }

    /// Seconds to wait before retrying a rate-limited call.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            SdkError::Api { body, .. } => body.retry_after,
            _ => None,
        }
    }
}
