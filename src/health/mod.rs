//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api/health:
//!     → active.rs (HEAD image, text, speech, transcription concurrently)
//!     → state.rs (per-service status → overall healthy/degraded/unhealthy)
//!
//! HEAD /api/health:
//!     → active.rs quick probe of the image upstream → 200 / 503
//! ```
//!
//! # Design Decisions
//! - Probes are on demand; nothing is cached between reports
//! - A probe failure never fails the report; it marks the service unhealthy

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::{HealthReport, OverallStatus, ServiceHealth, ServiceStatus};
