//! Response helpers shared by the endpoints.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const X_RESPONSE_TIME: &str = "x-response-time";
pub const X_CACHE: &str = "x-cache";
pub const X_CACHE_KEY: &str = "x-cache-key";

/// `data:<mime>;base64,<payload>` for binary upstream output.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Headers that forbid any caching (health reports).
pub fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers
}

/// Cache headers on generated images.
pub fn image_cache_headers(cache_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=300"),
    );
    headers.insert(HeaderName::from_static(X_CACHE), HeaderValue::from_static("MISS"));
    if let Ok(value) = HeaderValue::from_str(cache_key) {
        headers.insert(HeaderName::from_static(X_CACHE_KEY), value);
    }
    headers
}
