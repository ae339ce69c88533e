//! `listen`: serve every configured transport until Ctrl-C.
//!
//! ```text
//!            ┌── serial line task (one per device) ──┐
//! container ─┼── TCP listener task ──────────────────┼──→ shared QueryOrchestrator
//!            ├── admin HTTP task                     │
//!            └── spool retry loop ───────────────────┘
//! ```
//!
//! On Ctrl-C every task sees the shutdown signal, in-flight requests are
//! answered, pending audit appends are awaited and the spool is replayed a
//! last time.

use anyhow::anyhow;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::admin::{serve_admin, AdminState};
use crate::cli::ListenArgs;
use crate::config::NodeConfig;
use crate::container::AccessContainer;
use crate::transport::{run_serial_line, TcpTransport};
use crate::{CommandError, ExitStatus};

pub async fn run(config: NodeConfig, args: &ListenArgs) -> Result<ExitStatus, CommandError> {
    let container = AccessContainer::build(config)
        .await
        .map_err(CommandError::Startup)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = start(&container, args, shutdown_rx).await?;

    info!("bq-access listening, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to wait for Ctrl-C, shutting down");
    }
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    drain(&container, tasks).await;
    Ok(ExitStatus::Success)
}

/// Spawns every enabled task.
pub async fn start(
    container: &AccessContainer,
    args: &ListenArgs,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinSet<()>, CommandError> {
    let config = &container.config;
    let max_frame_bytes = config.query.max_frame_bytes;
    let mut tasks = JoinSet::new();
    let mut transports = 0;

    if config.tcp.enabled && !args.no_tcp {
        let transport = TcpTransport::bind(&config.tcp, max_frame_bytes)
            .await
            .map_err(|e| CommandError::Startup(e.into()))?;
        tasks.spawn(transport.run(container.orchestrator.clone(), shutdown.clone()));
        transports += 1;
    }

    if !args.no_serial {
        for line in &config.serial {
            tasks.spawn(run_serial_line(
                line.clone(),
                container.orchestrator.clone(),
                max_frame_bytes,
                shutdown.clone(),
            ));
            transports += 1;
        }
    }

    if transports == 0 {
        return Err(CommandError::Startup(anyhow!(
            "no transport enabled: configure [[serial]] lines or [tcp]"
        )));
    }

    if config.admin.enabled {
        let state = AdminState {
            store: container.store.clone(),
            spool: container.spool.clone(),
            unit_code: config.unit_code.clone(),
        };
        let addr = config.admin.listen_addr;
        let shutdown = shutdown.clone();
        tasks.spawn(async move {
            if let Err(e) = serve_admin(addr, state, shutdown).await {
                error!(addr = %addr, error = %e, "admin endpoint failed");
            }
        });
    }

    let orchestrator = container.orchestrator.clone();
    let interval = config.retry_interval();
    tasks.spawn(async move {
        orchestrator
            .audit_pipeline()
            .run_retry_loop(interval, shutdown)
            .await;
    });

    info!(transports, admin = config.admin.enabled, "tasks started");
    Ok(tasks)
}

/// Waits for every task, then settles the audit trail.
pub async fn drain(container: &AccessContainer, mut tasks: JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "task failed during shutdown");
        }
    }

    let pipeline = container.orchestrator.audit_pipeline();
    pipeline.flush().await;
    match pipeline.replay_spooled().await {
        Ok(report) if report.is_empty() => {}
        Ok(report) => info!(
            persisted = report.persisted,
            requeued = report.requeued,
            dead_lettered = report.dead_lettered,
            "final spool replay"
        ),
        Err(e) => warn!(error = %e, "final spool replay failed"),
    }
    info!("bq-access stopped");
}
