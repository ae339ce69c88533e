//! `info`: print the effective configuration with secrets masked.

use crate::config::NodeConfig;
use crate::{CommandError, ExitStatus};

pub fn run(config: &NodeConfig) -> Result<ExitStatus, CommandError> {
    let text = render(config)?;
    print!("{text}");
    Ok(ExitStatus::Success)
}

pub fn render(config: &NodeConfig) -> Result<String, CommandError> {
    let body = config
        .to_redacted_toml()
        .map_err(|e| CommandError::Failed(e.into()))?;
    Ok(format!(
        "# bq-access {}\n{body}",
        env!("CARGO_PKG_VERSION")
    ))
}
