//! # Access Node
//!
//! The `bq-access` binary and the pieces it is assembled from.
//!
//! ## Modular Structure
//!
//! - `config` - TOML file plus `BQ_*` environment overrides
//! - `container` - builds store, spool and orchestrator once
//! - `transport/` - CLI, serial and TCP frame sources over one request loop
//! - `admin` - `/health` and `/metrics` over HTTP
//! - `commands/` - one module per subcommand
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration (file, then environment, then flags) and validate it
//! 3. Initialize logging and metrics
//! 4. Build the container (store connection, spool directory)
//! 5. Run the subcommand
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Granted (`query`) or success |
//! | 1 | Denied |
//! | 2 | Rejected input (`ERROR`) or command failure |
//! | 3 | Configuration or startup failure |

pub mod adapters;
pub mod admin;
pub mod cli;
pub mod commands;
pub mod config;
pub mod container;
pub mod transport;

use std::process::ExitCode;

use thiserror::Error;

use crate::transport::ServeStats;

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    Denied = 1,
    Error = 2,
    StartupFailure = 3,
}

impl ExitStatus {
    /// Status for a one-shot query. A grant wins over anything else served.
    pub fn from_stats(stats: &ServeStats) -> Self {
        if stats.granted > 0 {
            ExitStatus::Success
        } else if stats.denied > 0 {
            ExitStatus::Denied
        } else {
            ExitStatus::Error
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Why a subcommand did not finish.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Store, spool or listener could not be set up.
    #[error("startup failed: {0:#}")]
    Startup(anyhow::Error),

    #[error("{0:#}")]
    Failed(anyhow::Error),
}

impl CommandError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            CommandError::Startup(_) => ExitStatus::StartupFailure,
            CommandError::Failed(_) => ExitStatus::Error,
        }
    }
}
