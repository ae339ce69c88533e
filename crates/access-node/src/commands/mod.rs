//! Subcommands. Each takes the validated configuration and returns the
//! process exit status.

pub mod check_store;
pub mod info;
pub mod listen;
pub mod query;
pub mod replay_spool;
pub mod simulate;

use crate::cli::Command;
use crate::config::NodeConfig;
use crate::{CommandError, ExitStatus};

/// Runs `command` to completion.
pub async fn dispatch(command: &Command, config: NodeConfig) -> Result<ExitStatus, CommandError> {
    match command {
        Command::Query(args) => query::run(config, args).await,
        Command::Listen(args) => listen::run(config, args).await,
        Command::CheckStore => check_store::run(config).await,
        Command::Info => info::run(&config),
        Command::Simulate => simulate::run(config).await,
        Command::ReplaySpool => replay_spool::run(config).await,
    }
}
