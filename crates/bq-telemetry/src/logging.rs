//! Structured logging setup.
//!
//! Human output by default, JSON when `json_logs` is set. Both go to stderr:
//! stdout belongs to command output such as the `query` response token.
//!
//! JSON lines carry:
//! - `timestamp`: ISO 8601 timestamp
//! - `level`: Log level
//! - `target`: Module path, or `bq::audit` for audit notes
//! - `fields`: Message plus the request fields (`transport`, `finger`,
//!   `fingerprint`, `reason`, `elapsed_ms`)

use std::io::IsTerminal;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Target used for audit notes and last-resort audit records.
pub const AUDIT_TARGET: &str = "bq::audit";

/// Builds the filter from the configured directive.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level {:?}: {e}", config.log_level)))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    let result = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true)
            .with_file(config.source_locations)
            .with_line_number(config.source_locations);
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(true)
            .with_file(config.source_locations)
            .with_line_number(config.source_locations);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        filter = %config.log_level,
        "Logging initialized"
    );
    Ok(())
}
