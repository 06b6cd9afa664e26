//! Typed client for the genai-gateway HTTP API.
//!
//! ```no_run
//! # async fn demo() -> Result<(), sdk_rust::SdkError> {
//! use sdk_rust::{GatewayClient, TextToImage};
//!
//! let client = GatewayClient::new("http://localhost:8080").with_turnstile_token("token");
//! let image = client.text_to_image(&TextToImage::new("a lighthouse at dusk")).await?;
//! println!("seed {}", image.seed);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::GatewayClient;
pub use error::{ErrorBody, SdkError};
pub use types::*;
