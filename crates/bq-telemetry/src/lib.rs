//! # Access Telemetry
//!
//! Logging and metrics for the biometric access query engine.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter`, human or JSON
//!   output. Audit notes use the `bq::audit` target so they can be routed to
//!   a separate sink.
//! - **Metrics**: Prometheus registry scraped through the node's admin
//!   endpoint.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bq_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = TelemetryConfig::from_env().with_verbosity(cli.verbose);
//!     init_telemetry(&config)?;
//!     // ...
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BQ_LOG_LEVEL` | `info` | Log filter, falls back to `RUST_LOG` |
//! | `BQ_JSON_LOGS` | `false` | JSON log lines (default on in containers) |
//! | `BQ_LOG_SOURCE` | `false` | File and line in log lines |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging, AUDIT_TARGET};
pub use metrics::{encode_metrics, register_metrics};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Registers metrics, then installs the log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
