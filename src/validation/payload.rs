//! Strict JSON request payloads.
//!
//! A `Payload` is a parsed JSON object with the verification token fields
//! already removed. Handlers `take_*` every field they recognise and then
//! call `finish`, which rejects whatever is left.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, FromRequest, Request},
    http::StatusCode,
};
use serde_json::{Map, Value};

use crate::http::error::ApiError;
use crate::security::turnstile::TOKEN_FIELDS;

/// Body that is not valid JSON, wherever it is first parsed.
pub fn malformed_body(err: &serde_json::Error) -> ApiError {
    ApiError::validation("Invalid request body format")
        .with_field("body")
        .with_details(serde_json::json!({ "parseError": err.to_string() }))
}

/// Body that could not be buffered: 413 past the size limit, 400 otherwise.
pub fn unreadable_body(rejection: BytesRejection) -> ApiError {
    let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        StatusCode::BAD_REQUEST
    };
    ApiError::bad_request(rejection.body_text()).with_status(status)
}

#[derive(Debug, Clone, Default)]
pub struct Payload {
    fields: Map<String, Value>,
}

impl Payload {
    /// Parse a request body. Anything other than a JSON object is a body-format error.
    pub fn parse(bytes: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| malformed_body(&e))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let Value::Object(mut fields) = value else {
            return Err(ApiError::validation("Invalid request body format").with_field("body"));
        };
        for token_field in TOKEN_FIELDS {
            fields.remove(token_field);
        }
        Ok(Self { fields })
    }

    /// Remove a field and return it as text.
    ///
    /// Numbers are accepted and stringified; `null` counts as absent.
    pub fn take_scalar(&mut self, key: &str) -> Result<Option<String>, ApiError> {
        match self.fields.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(ApiError::validation(format!("{} must be a string or number", key))
                .with_field(key)),
        }
    }

    /// Remove a field that must be a string when present.
    pub fn take_text(&mut self, key: &str) -> Result<Option<String>, ApiError> {
        match self.fields.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ApiError::validation(format!("{} must be a string", key)).with_field(key)),
        }
    }

    /// Reject any field nobody took.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.fields.is_empty() {
            return Ok(());
        }
        let unknown: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        Err(
            ApiError::validation(format!("Unknown fields: {}", unknown.join(", ")))
                .with_field("body")
                .with_details(serde_json::json!({ "unknownFields": unknown })),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(unreadable_body)?;
        Self::parse(&bytes)
    }
}
