//! Background task for purging old replay records.

use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::time::sleep;
use usef_db::DbPool;
use usef_replay::{purge_before, PurgeCounts, ReplayError};

/// Deletes replay records older than `retention_days`.
///
/// # Errors
///
/// Returns [`ReplayError::Pool`] if no connection is available, or
/// [`ReplayError::Database`] if the delete fails.
pub fn purge_expired(pool: &DbPool, retention_days: u32) -> Result<PurgeCounts, ReplayError> {
    let conn = pool.get().map_err(|e| ReplayError::Pool(e.to_string()))?;
    let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
    purge_before(&conn, cutoff)
}

/// Starts a background task that periodically purges old replay records.
///
/// This task runs indefinitely.
///
/// # Arguments
///
/// * `pool` - Database connection pool.
/// * `retention_days` - Age after which a record is dropped.
/// * `interval_seconds` - Time in seconds to wait between purges; 0 is treated as 1.
pub async fn start_retention_task(pool: DbPool, retention_days: u32, interval_seconds: u64) {
    let interval = Duration::from_secs(interval_seconds.max(1));
    tracing::info!(
        retention_days,
        interval_seconds,
        "starting replay record retention task"
    );

    loop {
        sleep(interval).await;

        let pool_clone = pool.clone();
        let result =
            tokio::task::spawn_blocking(move || purge_expired(&pool_clone, retention_days)).await;

        match result {
            Ok(Ok(counts)) if counts == PurgeCounts::default() => {
                tracing::debug!("no replay records to purge");
            }
            Ok(Ok(counts)) => {
                tracing::info!(
                    message_ids = counts.message_ids,
                    content_hashes = counts.content_hashes,
                    "purged replay records"
                );
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "failed to purge replay records");
            }
            Err(e) => {
                tracing::error!(error = %e, "retention task panicked or was cancelled");
            }
        }
    }
}
