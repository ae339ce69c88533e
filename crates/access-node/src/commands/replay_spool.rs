//! `replay-spool`: one replay pass over the local audit spool.

use anyhow::Context;
use bq_05_query_orchestrator::AuditPipeline;

use crate::config::NodeConfig;
use crate::container::AccessContainer;
use crate::{CommandError, ExitStatus};

pub async fn run(config: NodeConfig) -> Result<ExitStatus, CommandError> {
    let container = AccessContainer::build(config)
        .await
        .map_err(CommandError::Startup)?;
    let summary = replay(container.orchestrator.audit_pipeline()).await?;
    println!("{summary}");
    Ok(ExitStatus::Success)
}

/// Replays once and describes what is left.
pub async fn replay(pipeline: &AuditPipeline) -> Result<String, CommandError> {
    let report = pipeline
        .replay_spooled()
        .await
        .context("Failed to replay audit spool")
        .map_err(CommandError::Failed)?;
    let depth = pipeline
        .spool_depth()
        .await
        .context("Failed to read spool depth")
        .map_err(CommandError::Failed)?;
    let dead = pipeline
        .dead_letter_depth()
        .await
        .context("Failed to read dead letter depth")
        .map_err(CommandError::Failed)?;
    Ok(format!(
        "persisted={} requeued={} dead_lettered={} pending={} dead_letter_total={}",
        report.persisted, report.requeued, report.dead_lettered, depth, dead
    ))
}
