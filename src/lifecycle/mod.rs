//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build shared state → Start listeners + sweeper
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → listeners drain, sweeper exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Maintenance (maintenance.rs):
//!     Interval tick → limiter cleanup + error cache purge
//! ```

pub mod maintenance;
pub mod shutdown;
pub mod signals;

pub use maintenance::Maintenance;
pub use shutdown::Shutdown;
