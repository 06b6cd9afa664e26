//! Request validation subsystem.
//!
//! # Data Flow
//! ```text
//! Gated request body (already past rate limit + Turnstile)
//!     → payload.rs (parse JSON object, drop token fields)
//!     → schema.rs (per-endpoint typed request, built field by field)
//!         → rules.rs (required, enum, numeric range, URL)
//!         → sanitize.rs (strip tag-like sequences)
//!     → leftover keys rejected as unknown fields
//!     → typed request handed to the endpoint
//! ```
//!
//! # Design Decisions
//! - One schema type per endpoint; handlers never touch raw JSON
//! - Unknown fields are rejected before any value is inspected
//! - Random defaults (seeds) are drawn only after validation succeeds

pub mod payload;
pub mod rules;
pub mod sanitize;
pub mod schema;

pub use payload::Payload;
pub use schema::{
    ImagePromptRequest, ImageToImageRequest, OptimizePromptRequest, PromptDimensions,
    SpeechToTextRequest, TextToImageRequest, TextToSpeechRequest, TextToTextRequest,
};
