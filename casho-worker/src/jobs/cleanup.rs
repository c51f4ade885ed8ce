/// Retention cleanup
///
/// Deletes transactions dated before `today - RETENTION_DAYS`, purges
/// expired entries from the refresh-token blacklist, fails jobs abandoned in
/// `running` and drops finished jobs past the same retention window.

use casho_shared::models::{job::Job, revoked_token::RevokedToken, transaction::Transaction};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::Duration as StdDuration;

/// Transactions are kept for two years
pub const RETENTION_DAYS: i64 = 730;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Transactions dated before this day were deleted
    pub cutoff: NaiveDate,
    /// Deleted transactions
    pub deleted: u64,
    /// Blacklist entries whose token had expired anyway
    pub expired_tokens: u64,
    /// Jobs failed because they were stuck in `running`
    pub stale_jobs: u64,
    /// Finished jobs removed
    pub purged_jobs: u64,
}

pub fn cutoff(today: NaiveDate) -> NaiveDate {
    today - Duration::days(RETENTION_DAYS)
}

pub async fn run(
    pool: &PgPool,
    today: NaiveDate,
    stale_after: StdDuration,
) -> Result<CleanupReport, sqlx::Error> {
    let cutoff = cutoff(today);

    let deleted = Transaction::delete_dated_before(pool, cutoff).await?;
    let expired_tokens = RevokedToken::purge_expired(pool).await?;
    let stale_jobs = Job::fail_stale_running(pool, stale_after).await?;
    let purged_jobs = Job::purge_finished_before(pool, cutoff).await?;

    tracing::info!(%cutoff, deleted, expired_tokens, stale_jobs, purged_jobs, "Cleanup finished");

    Ok(CleanupReport {
        cutoff,
        deleted,
        expired_tokens,
        stale_jobs,
        purged_jobs,
    })
}
