//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID assigned, propagated to the response)
//!     → handlers.rs
//!         GET  /            → dashboard HTML
//!         GET  /api/pods    → snapshot as JSON
//!         POST /api/proxy   → action forwarder
//!         GET  /api/status  → build info + reconciler status
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{RequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
