//! Command line interface of `bq-access`.

use std::path::PathBuf;

use bq_04_request_protocol::{FIELD_SEPARATOR, QUERY_KEYWORD};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::NodeConfig;

#[derive(Parser, Debug)]
#[command(name = "bq-access", version)]
#[command(about = "Biometric access query engine: fingerprint templates in, grant/deny out")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "BQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Site identifier stamped on audit records (overrides config and env)
    #[arg(long, global = true)]
    pub unit: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer one request and exit (0 granted, 1 denied, 2 error)
    Query(QueryArgs),
    /// Serve serial lines and the TCP listener until Ctrl-C
    Listen(ListenArgs),
    /// Check that the identity store is reachable
    CheckStore,
    /// Print the effective configuration
    Info,
    /// Run the built-in request scenarios against an in-memory store
    Simulate,
    /// Retry spooled audit records once, then print the spool depth
    ReplaySpool,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Complete request frame, e.g. QUERY:<base64>:index_right
    #[arg(long, conflicts_with_all = ["template", "finger"], required_unless_present = "template")]
    pub frame: Option<String>,

    /// Base64 template
    #[arg(long, requires = "finger")]
    pub template: Option<String>,

    /// Finger position token
    #[arg(long, requires = "template")]
    pub finger: Option<String>,
}

impl QueryArgs {
    /// The frame to hand to the orchestrator. Tokens are passed through
    /// unvalidated.
    pub fn frame(&self) -> Vec<u8> {
        match (&self.frame, &self.template, &self.finger) {
            (Some(frame), _, _) => frame.clone().into_bytes(),
            (None, template, finger) => format!(
                "{QUERY_KEYWORD}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
                template.as_deref().unwrap_or_default(),
                finger.as_deref().unwrap_or_default()
            )
            .into_bytes(),
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ListenArgs {
    /// Do not open serial lines
    #[arg(long)]
    pub no_serial: bool,

    /// Do not start the TCP listener
    #[arg(long)]
    pub no_tcp: bool,
}

impl Cli {
    /// Applies flags that override configuration values.
    pub fn apply_overrides(&self, config: &mut NodeConfig) {
        if let Some(unit) = &self.unit {
            config.unit_code = unit.clone();
        }
    }
}
