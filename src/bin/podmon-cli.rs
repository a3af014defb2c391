use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use pod_monitor::config::ProbeConfig;
use pod_monitor::probe::{ProbeAction, ProbeClient, ProbeKind};

#[derive(Parser)]
#[command(name = "podmon-cli")]
#[command(about = "Management CLI for the pod monitor", long_about = None)]
struct Cli {
    #[arg(short, long, env = "POD_MONITOR_URL", default_value = "http://localhost:8090")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every monitored pod
    Pods,
    /// Show build info and reconciler status
    Status,
    /// Flip one probe on one pod through the monitor's relay
    Toggle {
        /// Pod address as shown by `pods` (IP or host:port)
        #[arg(long)]
        address: String,
        /// startup, liveness or readiness
        #[arg(long)]
        probe: ProbeKind,
        /// fail or recover; derived from the probe's current state when omitted
        #[arg(long)]
        action: Option<ProbeAction>,
        /// Port of the pod's probe API
        #[arg(long, default_value_t = 8080)]
        probe_port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Pods => {
            let res = client.get(format!("{base}/api/pods")).send().await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client.get(format!("{base}/api/status")).send().await?;
            print_response(res).await?;
        }
        Commands::Toggle {
            address,
            probe,
            action,
            probe_port,
        } => {
            let action = match action {
                Some(action) => action,
                None => {
                    let pods: Value = client
                        .get(format!("{base}/api/pods"))
                        .send()
                        .await?
                        .error_for_status()?
                        .json()
                        .await?;
                    let passing = current_probe_state(&pods, &address, probe)
                        .ok_or_else(|| format!("no probe status reported for {address}"))?;
                    ProbeAction::toggle(passing)
                }
            };

            let probe_client = ProbeClient::new(&ProbeConfig {
                port: probe_port,
                ..ProbeConfig::default()
            })?;
            let target = probe_client.action_url(&address, probe, action);
            eprintln!("{} {} -> {}", probe.as_str(), action.as_str(), target);

            let res = client
                .post(format!("{base}/api/proxy"))
                .json(&json!({ "url": target, "method": "POST" }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Look up a probe flag in an `/api/pods` document by pod address.
fn current_probe_state(pods: &Value, address: &str, probe: ProbeKind) -> Option<bool> {
    let flag = match probe {
        ProbeKind::Startup => "started",
        ProbeKind::Liveness => "live",
        ProbeKind::Readiness => "ready",
    };
    pods.as_object()?
        .values()
        .find(|pod| pod.get("IP").and_then(Value::as_str) == Some(address))?
        .pointer(&format!("/Info/probeStatus/{flag}"))?
        .as_bool()
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: monitor returned status {}", status);
        eprintln!("Response: {}", text.trim_end());
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text.trim_end()),
    }
    Ok(())
}
