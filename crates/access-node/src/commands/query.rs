//! `query`: one frame from the command line, one response on stdout.

use anyhow::Context;
use bq_05_query_orchestrator::QueryOrchestrator;
use shared_types::TransportOrigin;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::cli::QueryArgs;
use crate::config::NodeConfig;
use crate::container::AccessContainer;
use crate::transport::{framing, serve, CliSource};
use crate::{CommandError, ExitStatus};

pub async fn run(config: NodeConfig, args: &QueryArgs) -> Result<ExitStatus, CommandError> {
    let container = AccessContainer::build(config)
        .await
        .map_err(CommandError::Startup)?;
    answer(&container.orchestrator, args.frame(), tokio::io::stdout()).await
}

/// Answers `frame` on `out` and waits for its audit record to settle.
pub async fn answer<W>(
    orchestrator: &QueryOrchestrator,
    frame: Vec<u8>,
    mut out: W,
) -> Result<ExitStatus, CommandError>
where
    W: AsyncWrite + Unpin + Send,
{
    // Streams skip blank lines; a one-shot query must still be answered.
    if framing::is_blank(&frame) {
        let outcome = orchestrator.reject_frame(TransportOrigin::Cli, "empty frame");
        out.write_all(&outcome.response)
            .await
            .context("Failed to write response")
            .map_err(CommandError::Failed)?;
        out.flush()
            .await
            .context("Failed to write response")
            .map_err(CommandError::Failed)?;
        return Ok(ExitStatus::Error);
    }

    let mut source = CliSource::new(frame, out);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let stats = serve(&mut source, orchestrator, Some(1), shutdown_rx)
        .await
        .map_err(|e| CommandError::Failed(e.into()))?;

    orchestrator.audit_pipeline().flush().await;
    Ok(ExitStatus::from_stats(&stats))
}
