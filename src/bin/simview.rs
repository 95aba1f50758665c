//! Headless simulation viewer.
//!
//! Connects to a simulation server, plays the frame stream into an in-memory
//! object pool and logs playback progress once per second.
//!
//! # Usage
//!
//! ```sh
//! simview --config simview.yaml
//! simview --host 192.168.0.6:8000 sph_system
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl-C): send `close` to the server and stop playback

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{info, warn};

use simview::{ClientConfig, ObjectPool, Scenario, SharedSink, Simview};

/// Interval between status log lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    host: Option<String>,
    scenario: Option<Scenario>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simview::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let args = parse_args(&args)?;
    let config = load_config(&args)?;

    let objects = config.endpoint.scenario.particle_count();
    let pool: SharedSink<ObjectPool> = Arc::new(Mutex::new(ObjectPool::new(objects)));

    let mut session = Simview::from_config(&config, pool.clone())
        .await
        .with_context(|| format!("failed to connect to {}", config.endpoint.url()))?;

    let mut ticker = tokio::time::interval(STATUS_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Could not listen for Ctrl-C");
                }
                info!("Interrupted, closing session");
                break;
            }
            _ = ticker.tick() => {
                let status = session.status();
                let stats = session.ingest_stats();
                info!(
                    state = ?status.state,
                    time = ?status.current_time,
                    presented = status.presented,
                    dropped = status.dropped,
                    buffered = status.buffered,
                    received = stats.received,
                    malformed = stats.malformed,
                    "Playback status"
                );

                if !session.connection_state().is_connected() && status.buffered == 0 {
                    info!("Server stream ended and buffer drained");
                    break;
                }
            }
        }
    }

    session.close().await;

    let applied = pool.lock().map(|pool| pool.frames_applied()).unwrap_or_default();
    info!(frames = applied, "Viewer stopped");
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &args.host {
        config.endpoint.host = host.clone();
    }
    if let Some(scenario) = args.scenario {
        config.endpoint.scenario = scenario;
    }
    config.validate()?;
    Ok(config)
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    bail!("missing value for --config");
                };
                parsed.config = Some(PathBuf::from(path));
            }
            "--host" | "-H" => {
                i += 1;
                let Some(host) = args.get(i) else {
                    bail!("missing value for --host");
                };
                parsed.host = Some(host.clone());
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option: {}", other),
            scenario => {
                parsed.scenario = Some(scenario.parse()?);
            }
        }
        i += 1;
    }

    Ok(parsed)
}

fn print_usage() {
    let scenarios: Vec<&str> = Scenario::ALL.iter().map(|s| s.as_str()).collect();
    eprintln!("Usage: simview [--config PATH] [--host HOST:PORT] [SCENARIO]");
    eprintln!();
    eprintln!("Scenarios: {}", scenarios.join(", "));
}
