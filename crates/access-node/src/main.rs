//! # bq-access
//!
//! Entry point of the biometric access query engine.
//!
//! ```text
//! bq-access [-c FILE] [--unit CODE] [-v] <query|listen|check-store|info|simulate|replay-spool>
//! ```
//!
//! See the `access_node` library docs for the startup sequence and exit
//! codes.

use std::process::ExitCode;

use access_node::cli::{Cli, Command};
use access_node::commands;
use access_node::config::{NodeConfig, StoreBackend};
use access_node::ExitStatus;
use anyhow::{Context, Result};
use bq_telemetry::{init_telemetry, TelemetryConfig};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bq-access: {e:#}");
            return ExitStatus::StartupFailure.into();
        }
    };

    let telemetry = TelemetryConfig::from_env().with_verbosity(cli.verbose);
    if let Err(e) = init_telemetry(&telemetry) {
        eprintln!("bq-access: failed to initialize telemetry: {e}");
        return ExitStatus::StartupFailure.into();
    }

    if !matches!(cli.command, Command::Info) {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            unit = %config.unit_code,
            store = config.store.backend.as_str(),
            "bq-access starting"
        );
    }

    match commands::dispatch(&cli.command, config).await {
        Ok(status) => status.into(),
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("bq-access: {e}");
            e.exit_status().into()
        }
    }
}

/// File, then environment, then command line flags.
fn load_config(cli: &Cli) -> Result<NodeConfig> {
    let mut config =
        NodeConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    if matches!(cli.command, Command::Simulate) {
        // Simulation runs against its own in-memory store.
        config.store.backend = StoreBackend::Memory;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
