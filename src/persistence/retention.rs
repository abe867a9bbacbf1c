//! Retention service for time-based purge of stale execution states.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::state_repo::SqliteStateStore;
use crate::Result;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the retention purge background task.
///
/// The task runs hourly. On each tick it deletes every execution state
/// that has not been saved for longer than `retention_days`.
#[must_use]
pub fn spawn_retention_task(
    store: Arc<SqliteStateStore>,
    retention_days: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge(&store, retention_days).await {
                        error!(?err, "retention purge failed");
                    }
                }
            }
        }
    })
}

/// Run one purge pass; returns the number of states deleted.
///
/// # Errors
///
/// Returns `AppError::Db` if the delete fails.
pub async fn purge(store: &SqliteStateStore, retention_days: u32) -> Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
    let deleted = store.purge(cutoff).await?;
    info!(retention_days, deleted, "retention purge completed");
    Ok(deleted)
}
