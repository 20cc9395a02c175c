//! Shutdown daemon.
//!
//! Arms the configured triggers and keeps the process alive until one of
//! them fires, then runs the shutdown sequence and exits.
//!
//! ```text
//! shutdownd --config shutdownd.toml
//!     → load & validate config
//!     → logging, metrics
//!     → coordinator: signal / sentinel file / admin triggers, PID file
//!     → start, wait for Terminated
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::Instrument;

use graceful_shutdown::config::{load_config, DaemonConfig};
use graceful_shutdown::lifecycle::startup::build_coordinator;
use graceful_shutdown::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "shutdownd")]
#[command(about = "Graceful shutdown coordinator daemon", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the PID here and remove it on shutdown (overrides config).
    #[arg(long)]
    pid_file: Option<PathBuf>,

    /// Log level (overrides config).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(pid_file) = cli.pid_file {
        config.pid_file = Some(pid_file);
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init_logging(&config.observability)?;

    let span = tracing::info_span!("service", name = %config.observability.service_name);
    run(config).instrument(span).await
}

async fn run(config: DaemonConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "shutdownd starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let coordinator = build_coordinator(&config)?;
    coordinator.start()?;

    // The signal trigger exits the process itself; the others return here.
    coordinator.wait_terminated().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
