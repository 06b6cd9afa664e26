//! Generative-AI gateway library.
//!
//! Proxies image, text, speech and transcription requests to the
//! Pollinations APIs behind per-IP rate limiting and Cloudflare Turnstile
//! verification, with uniform validation and a single JSON error envelope.

// Core subsystems
pub mod config;
pub mod http;
pub mod upstream;
pub mod validation;

// Traffic management
pub mod health;
pub mod security;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
