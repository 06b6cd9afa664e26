//! Client identity resolution from proxy headers.
//!
//! # Design Decisions
//! - Edge-injected `cf-connecting-ip` wins over client-spoofable headers
//! - Only the first hop of `x-forwarded-for` is used
//! - Never fails: local/dev traffic without headers maps to loopback

use std::fmt;

use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};

/// Identity used when no proxy header is present.
pub const FALLBACK_IDENTITY: &str = "127.0.0.1";

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Per-request client identity, used as the rate-limiter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let resolved = header(CF_CONNECTING_IP)
            .or_else(|| {
                header(X_FORWARDED_FOR)
                    .and_then(|v| v.split(',').next())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            })
            .or_else(|| header(X_REAL_IP))
            .unwrap_or(FALLBACK_IDENTITY);

        Self(resolved.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_cdn_header_preferred() {
        let h = headers(&[
            ("cf-connecting-ip", "203.0.113.7"),
            ("x-forwarded-for", "198.51.100.1"),
            ("x-real-ip", "192.0.2.1"),
        ]);
        assert_eq!(ClientIdentity::from_headers(&h).as_str(), "203.0.113.7");
    }

    #[test]
    fn test_first_forwarded_hop_trimmed() {
        let h = headers(&[("x-forwarded-for", "  198.51.100.1 , 10.0.0.1")]);
        assert_eq!(ClientIdentity::from_headers(&h).as_str(), "198.51.100.1");
    }

    #[test]
    fn test_real_ip_then_fallback() {
        let h = headers(&[("x-real-ip", "192.0.2.1")]);
        assert_eq!(ClientIdentity::from_headers(&h).as_str(), "192.0.2.1");
        assert_eq!(
            ClientIdentity::from_headers(&HeaderMap::new()).as_str(),
            FALLBACK_IDENTITY
        );
    }

    #[test]
    fn test_empty_values_skipped() {
        let h = headers(&[("cf-connecting-ip", " "), ("x-forwarded-for", ",10.0.0.1")]);
        assert_eq!(ClientIdentity::from_headers(&h).as_str(), FALLBACK_IDENTITY);
    }
}
