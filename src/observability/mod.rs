//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → request_log.rs (bounded per-request history)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Admin API (request statistics, recent logs)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all request events
//! - Security events (rate limiting, verification) are logged with the client identity

pub mod logging;
pub mod metrics;
pub mod request_log;

pub use request_log::{LogEntry, RequestLog, RequestStats};
