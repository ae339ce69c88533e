//! # Access Container
//!
//! Builds the shared components once at startup and hands them out
//! explicitly.
//!
//! ```text
//! NodeConfig ──→ identity store (postgres | memory) ──┐
//!            ──→ audit spool (file, flock)           ├──→ QueryOrchestrator ──→ transports
//!            ──→ Prometheus metrics adapter ─────────┘
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bq_02_identity_store::{AuditSpool, FileAuditSpool, IdentityStore, InMemoryIdentityStore};
use bq_05_query_orchestrator::QueryOrchestrator;
use tracing::{info, instrument};

use crate::adapters::PrometheusQueryMetrics;
use crate::config::{NodeConfig, StoreBackend, StoreConfig};

/// Everything a command needs, constructed once.
pub struct AccessContainer {
    pub config: NodeConfig,
    pub store: Arc<dyn IdentityStore>,
    pub spool: Arc<dyn AuditSpool>,
    pub orchestrator: QueryOrchestrator,
}

impl AccessContainer {
    /// Connects the configured store and opens the spool directory.
    #[instrument(skip_all, fields(unit = %config.unit_code, backend = config.store.backend.as_str()))]
    pub async fn build(config: NodeConfig) -> Result<Self> {
        let store = build_store(&config.store).await?;
        let spool: Arc<dyn AuditSpool> = Arc::new(
            FileAuditSpool::open(&config.audit.spool_dir, config.audit.max_spooled)
                .with_context(|| {
                    format!(
                        "Failed to open audit spool in {}",
                        config.audit.spool_dir.display()
                    )
                })?,
        );
        Self::from_parts(config, store, spool)
    }

    /// Wires already-built store and spool.
    pub fn from_parts(
        config: NodeConfig,
        store: Arc<dyn IdentityStore>,
        spool: Arc<dyn AuditSpool>,
    ) -> Result<Self> {
        let orchestrator = QueryOrchestrator::with_ports(
            config.orchestrator_config(),
            Arc::clone(&store),
            Arc::clone(&spool),
            Arc::new(bq_05_query_orchestrator::SystemClock),
            Arc::new(PrometheusQueryMetrics),
        )
        .context("Failed to build query orchestrator")?;

        info!(
            backend = store.backend(),
            threshold = config.matching.threshold,
            deadline_ms = config.query.deadline_ms,
            "access container ready"
        );

        Ok(Self {
            config,
            store,
            spool,
            orchestrator,
        })
    }
}

/// Builds the identity store named by `config.backend`.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn IdentityStore>> {
    match config.backend {
        StoreBackend::Memory => {
            let store = match &config.fixtures {
                Some(path) => InMemoryIdentityStore::from_fixture_file(path)
                    .with_context(|| format!("Failed to load fixtures {}", path.display()))?,
                None => InMemoryIdentityStore::new(),
            };
            info!(enrolled = store.enrolled_count(), "in-memory identity store");
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => build_postgres(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn build_postgres(config: &StoreConfig) -> Result<Arc<dyn IdentityStore>> {
    use std::time::Duration;

    use bq_02_identity_store::{PostgresConfig, PostgresIdentityStore};

    let Some(database_url) = config.database_url.clone() else {
        bail!("store.database_url is not set");
    };
    let pg = PostgresConfig {
        database_url,
        max_connections: config.max_connections,
        acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
        max_candidates: config.max_candidates,
    };
    let store = PostgresIdentityStore::connect(&pg)
        .await
        .context("Failed to connect to identity store")?;
    store
        .ensure_audit_table()
        .await
        .context("Failed to prepare access_audit table")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn build_postgres(_config: &StoreConfig) -> Result<Arc<dyn IdentityStore>> {
    bail!("postgres backend requested but bq-access was built without the `postgres` feature")
}
