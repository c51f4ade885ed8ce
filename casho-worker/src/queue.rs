/// Job queue
///
/// Thin layer over the `jobs` table. Claiming moves rows from `pending` to
/// `running` with `FOR UPDATE SKIP LOCKED`, so several workers can poll the
/// same table without receiving the same job. Finished jobs are never
/// retried.
///
/// # Example
///
/// ```no_run
/// use casho_worker::queue::JobQueue;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), casho_worker::queue::QueueError> {
/// let queue = JobQueue::new(pool);
/// for job in queue.claim(None).await? {
///     println!("Claimed job {} ({})", job.id, job.kind);
/// }
/// # Ok(())
/// # }
/// ```

use casho_shared::models::job::{Job, NewJob};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The job was not running, so its outcome could not be recorded
    #[error("Job {0} is not running")]
    NotRunning(Uuid),
}

#[derive(Clone)]
pub struct JobQueue {
    db: PgPool,

    /// Jobs claimed per call when no limit is given
    batch_size: usize,
}

impl JobQueue {
    pub fn new(db: PgPool) -> Self {
        JobQueue { db, batch_size: 10 }
    }

    pub fn with_batch_size(db: PgPool, batch_size: usize) -> Self {
        JobQueue { db, batch_size }
    }

    /// Adds a job; None when its dedupe key is already taken
    pub async fn enqueue(&self, job: NewJob) -> Result<Option<Job>, QueueError> {
        let inserted = Job::enqueue(&self.db, job).await?;

        if let Some(job) = &inserted {
            tracing::debug!(job_id = %job.id, kind = %job.kind, "Job enqueued");
        }

        Ok(inserted)
    }

    /// Claims up to `limit` (default: batch size) pending jobs, oldest first
    pub async fn claim(&self, limit: Option<usize>) -> Result<Vec<Job>, QueueError> {
        let limit = limit.unwrap_or(self.batch_size) as i64;
        let jobs = Job::claim_pending(&self.db, limit).await?;

        if !jobs.is_empty() {
            tracing::info!(count = jobs.len(), "Claimed jobs");
        }

        Ok(jobs)
    }

    pub async fn mark_succeeded(&self, id: Uuid, result: JsonValue) -> Result<(), QueueError> {
        if !Job::mark_succeeded(&self.db, id, result).await? {
            return Err(QueueError::NotRunning(id));
        }
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), QueueError> {
        if !Job::mark_failed(&self.db, id, error).await? {
            return Err(QueueError::NotRunning(id));
        }
        Ok(())
    }

    /// Fails jobs left running longer than `older_than`
    pub async fn reap_stale(&self, older_than: Duration) -> Result<u64, QueueError> {
        let reaped = Job::fail_stale_running(&self.db, older_than).await?;

        if reaped > 0 {
            tracing::warn!(count = reaped, "Failed stale running jobs");
        }

        Ok(reaped)
    }

    pub async fn pending_count(&self) -> Result<i64, QueueError> {
        Ok(Job::pending_count(&self.db).await?)
    }
}
