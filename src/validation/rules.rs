//! Reusable field rules.
//!
//! Each rule takes the raw optional value pulled from a `Payload` and
//! either returns the typed value or the `ApiError` to send back.

use rand::Rng;
use url::Url;

use crate::http::error::{ApiError, ErrorKind};

/// Largest seed the image service accepts.
pub const MAX_SEED: u32 = 999_999_999;

/// Present and non-blank after trimming.
pub fn required(value: Option<String>, field: &str, message: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::validation(message).with_field(field)),
    }
}

/// Length in characters, not bytes.
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Optional enum member; blank means "use the default".
pub fn one_of(
    value: Option<String>,
    allowed: &[&str],
    default: &str,
    error: impl FnOnce() -> ApiError,
) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        None => Ok(default.to_string()),
        Some(v) if v.is_empty() => Ok(default.to_string()),
        Some(v) if allowed.contains(&v.as_str()) => Ok(v),
        Some(_) => Err(error()),
    }
}

/// Finite float inside `[min, max]`, or the default when absent.
pub fn float_in_range(
    value: Option<String>,
    min: f64,
    max: f64,
    default: f64,
    error: impl FnOnce() -> ApiError,
) -> Result<f64, ApiError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && (min..=max).contains(&v) => Ok(v),
        _ => Err(error()),
    }
}

/// Integer pixel dimension inside `[min, max]`.
pub fn image_dimension(
    value: Option<String>,
    field: &str,
    min: u32,
    max: u32,
    default: u32,
) -> Result<u32, ApiError> {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(v) if (min..=max).contains(&v) => Ok(v),
        _ => Err(ApiError::new(
            ErrorKind::InvalidImageSize,
            format!("{} must be an integer between {} and {}", field, min, max),
        )
        .with_field(field)),
    }
}

/// Requested seed when valid, otherwise a uniformly random one.
pub fn seed_or_random(value: Option<String>) -> u32 {
    value
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|v| (0..=MAX_SEED as i64).contains(v))
        .map(|v| v as u32)
        .unwrap_or_else(random_seed)
}

pub fn random_seed() -> u32 {
    rand::thread_rng().gen_range(0..=MAX_SEED)
}

/// Absolute http(s) URL.
pub fn http_url(value: &str, field: &str) -> Result<Url, ApiError> {
    match Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ApiError::validation(format!("{} must be a valid URL", field)).with_field(field)),
    }
}
