//! Upstream generative API subsystem.
//!
//! # Data Flow
//! ```text
//! Validated request
//!     → error_cache.rs (refuse fingerprints that failed recently)
//!     → client.rs (build URL, call with deadline, read body)
//!         → on failure: record fingerprint, translate to ApiError
//!     → endpoint wraps bytes/text into the JSON response
//! ```

pub mod client;
pub mod error_cache;

pub use client::{ProbeResult, Service, UpstreamClient, UpstreamError};
pub use error_cache::{fingerprint, ErrorCache};
