//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request id assignment and propagation)
//!     → [rate limit → verification gate] (gated routes only)
//!     → endpoints/ (validate, call upstream, shape JSON)
//!     → response.rs (cache headers, data URLs)
//!     → error.rs (every failure leaves as one envelope shape)
//! ```

pub mod endpoints;
pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::{ApiError, ErrorKind};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, StartupError};
