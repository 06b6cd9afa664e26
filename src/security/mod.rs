//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming gated request:
//!     → client_ip.rs (resolve identity from proxy headers)
//!     → rate_limit.rs (fixed-window check, 429 on excess)
//!     → turnstile.rs (human verification, 400/403 on failure)
//!     → Pass to endpoint validation
//!
//! Every response:
//!     → headers.rs (framing, sniffing, referrer protections)
//! ```
//!
//! # Design Decisions
//! - Cheapest check first: rate limiting runs before the verification call
//! - Fail closed: missing verification keys block, never bypass
//! - No trust in client input

pub mod client_ip;
pub mod headers;
pub mod rate_limit;
pub mod turnstile;

pub use client_ip::ClientIdentity;
pub use rate_limit::{Clock, FixedWindowRateLimiter, ManualClock, RateLimitDecision, SystemClock};
pub use turnstile::{TurnstileGate, VerificationOutcome};
