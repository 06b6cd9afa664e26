//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce per-kind deadline)
//!     → On failure: upstream::ErrorCache remembers the fingerprint briefly
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No automatic retries; retry policy belongs to the client

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineElapsed};
