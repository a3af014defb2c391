//! Pod Monitor
//!
//! Watches pods that carry a probe-demo label and shows their startup,
//! liveness and readiness state on a live dashboard, with one-click toggles.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐  list   ┌─────────────────────────────────────────────┐
//!   │ Kubernetes   │◀────────│  reconcile (every 5s)                       │
//!   │ API server   │         │    discovery → probe fetch → state store    │
//!   └──────────────┘         └──────────────┬──────────────────────────────┘
//!                                           │ GET /api/info
//!   ┌──────────────┐                        ▼
//!   │  pod :8080   │◀──── probe client ─────┘
//!   └──────▲───────┘
//!          │ POST /api/probes/{probe}/{action}
//!          │
//!   ┌──────┴──────────────────────────────────────────────────────────────┐
//!   │ http (:8090)                                                         │
//!   │   GET  /           dashboard (snapshot reader → askama template)    │
//!   │   GET  /api/pods   snapshot as JSON                                 │
//!   │   POST /api/proxy  action forwarder → probe client                  │
//!   │   GET  /api/status build info + reconciler status                   │
//!   └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use pod_monitor::config;
use pod_monitor::lifecycle;
use pod_monitor::observability::logging;

#[derive(Parser)]
#[command(name = "pod-monitor", version, about = "Live dashboard for pod probe state")]
struct Args {
    /// Path to a TOML config file; defaults apply when omitted
    #[arg(short, long, env = "POD_MONITOR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(Default::default());
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    logging::init(config.observability.log_format);

    lifecycle::run(config).await?;
    Ok(())
}
