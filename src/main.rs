//! lifecycle-notifier
//!
//! A long-running service that reports its lifecycle to a process supervisor over
//! the `NOTIFY_SOCKET` datagram protocol and lets signals drive its state.
//!
//! # Architecture Overview
//!
//! ```text
//!   supervisor ──signals──▶ lifecycle::signals ──requests──▶ lifecycle::state
//!                                  │ SIGUSR2                        │
//!                                  ▼                                ▼
//!                           lifecycle::debug              lifecycle::service (loop)
//!                                  │                                │
//!                                  └────────────┬───────────────────┘
//!                                               ▼
//!   supervisor ◀──────── datagram ──────── notify::Notifier
//! ```
//!
//! # Signals
//! - SIGHUP: reload configuration (`RELOADING=1` … `READY=1`)
//! - SIGINT/SIGTERM: graceful shutdown (`STOPPING=1`, exit 0)
//! - SIGUSR1: simulated crash during reload (exit 1)
//! - SIGUSR2: remote debug listener (`DEBUG=1`)

use std::path::PathBuf;

use clap::Parser;

use lifecycle_notifier::config::{load_config, validate_config, ConfigError, ServiceConfig, StartupOverrides};
use lifecycle_notifier::lifecycle::{Heartbeat, Outcome, Service, FAKE_DEATH_MESSAGE};
use lifecycle_notifier::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "lifecycle-notifier")]
#[command(about = "Supervised service reporting its lifecycle over NOTIFY_SOCKET", long_about = None)]
struct Cli {
    /// TOML configuration file, re-read on SIGHUP.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to sleep between loop iterations.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Start with debug output enabled.
    #[arg(long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    let mut overrides = StartupOverrides::from_env();
    if cli.interval_secs.is_some() {
        overrides.interval_secs = cli.interval_secs;
    }
    if cli.debug {
        overrides.debug = Some(true);
    }
    if cli.log_level.is_some() {
        overrides.log_level = cli.log_level;
    }
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!(
        pid = std::process::id(),
        "lifecycle-notifier v{} starting",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        interval_secs = config.service.interval_secs,
        debug = config.debug.enabled,
        socket_env = %config.notify.socket_env,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let mut service = Service::new(config, Heartbeat::default()).with_overrides(overrides);
    if let Some(path) = cli.config {
        service = service.with_config_path(path);
    }

    match service.run().await? {
        Outcome::Stopped => {
            tracing::info!("Stopped app");
            Ok(())
        }
        Outcome::FakedDeath => {
            eprintln!("{FAKE_DEATH_MESSAGE}");
            std::process::exit(Outcome::FakedDeath.exit_code());
        }
    }
}
