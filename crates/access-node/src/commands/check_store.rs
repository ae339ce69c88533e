//! `check-store`: prove the identity store is reachable.

use anyhow::Context;
use bq_02_identity_store::IdentityStore;

use crate::config::NodeConfig;
use crate::container::build_store;
use crate::{CommandError, ExitStatus};

pub async fn run(config: NodeConfig) -> Result<ExitStatus, CommandError> {
    let store = build_store(&config.store)
        .await
        .map_err(CommandError::Startup)?;
    check(store.as_ref()).await?;
    println!("identity store ok ({})", store.backend());
    Ok(ExitStatus::Success)
}

pub async fn check(store: &dyn IdentityStore) -> Result<(), CommandError> {
    store
        .health_check()
        .await
        .with_context(|| format!("{} identity store is not healthy", store.backend()))
        .map_err(CommandError::Failed)
}
