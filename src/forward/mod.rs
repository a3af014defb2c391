//! Action forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/proxy {"url", "method"}
//!     → ActionForwarder::decode (body → ActionRequest)
//!     → ActionForwarder::resolve (method, scheme, monitored-host check)
//!     → ProbeClient::forward
//!     → remote status + body back to the caller
//! ```
//!
//! # Design Decisions
//! - The dashboard runs in a browser that cannot always reach instance
//!   addresses; this is a same-origin relay for it
//! - Targets are limited to monitored instance hosts unless
//!   `forwarder.restrict_targets` is turned off
//! - Relay failures surface to the caller; nothing is retried

pub mod forwarder;

pub use forwarder::{ActionForwarder, ActionRequest, ForwardError};
