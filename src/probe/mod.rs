//! Remote probe subsystem.
//!
//! # Data Flow
//! ```text
//! Reconciler
//!     → StatusFetcher::fetch_status(address)
//!     → GET http://<address>:<port>/api/info
//!     → RemoteStatus | FetchError
//!
//! Action forwarder
//!     → ProbeClient::forward(url, method)
//!     → RelayedResponse (status + raw body) | RelayError
//! ```

pub mod client;
pub mod types;

pub use client::{FetchError, ProbeClient, RelayError, RelayedResponse, StatusFetcher};
pub use types::{ProbeAction, ProbeFlags, ProbeKind, RemoteStatus};
