//! Security response headers.
//!
//! # Responsibilities
//! - Add clickjacking, MIME-sniffing and referrer protections
//! - Preconnect hint for the verification widget origin
//!
//! # Design Decisions
//! - Headers are only set when the handler has not set them already
//! - Framing is relaxed to SAMEORIGIN in development

use axum::{
    http::{header, HeaderName, HeaderValue},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Environment;

/// Origin of the verification widget script.
pub const CHALLENGE_ORIGIN: &str = "https://challenges.cloudflare.com";

/// The header set applied to every response.
pub fn security_headers(environment: Environment) -> Vec<(HeaderName, HeaderValue)> {
    let frame_options = match environment {
        Environment::Development => "SAMEORIGIN",
        Environment::Production => "DENY",
    };
    vec![
        (
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static(frame_options),
        ),
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
        (
            header::LINK,
            HeaderValue::from_static("<https://challenges.cloudflare.com>; rel=preconnect"),
        ),
    ]
}

/// Layer the security headers onto a router.
pub fn apply_security_headers<S>(router: Router<S>, environment: Environment) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    security_headers(environment)
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(name, value))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_headers_applied_in_production() {
        let app = apply_security_headers(
            Router::new().route("/", get(|| async { "ok" })),
            Environment::Production,
        );
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(headers[header::LINK].to_str().unwrap().contains(CHALLENGE_ORIGIN));
    }

    #[test]
    fn test_development_allows_same_origin_framing() {
        let set = security_headers(Environment::Development);
        assert_eq!(set[0].1, "SAMEORIGIN");
    }
}
