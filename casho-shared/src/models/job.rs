/// Background job rows
///
/// The API enqueues on-demand jobs (a monthly report for the caller) and the
/// worker's scheduler enqueues periodic ones. Workers claim pending rows with
/// `FOR UPDATE SKIP LOCKED`, so each job runs exactly once.
///
/// Periodic jobs carry a `dedupe_key` (e.g. `cleanup:2024-01-31`); inserting
/// a key that already exists is silently skipped, which keeps the schedule
/// idempotent across ticks and across several workers.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE jobs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     kind VARCHAR(32) NOT NULL,
///     payload JSONB NOT NULL DEFAULT '{}'::jsonb,
///     state VARCHAR(16) NOT NULL DEFAULT 'pending',
///     dedupe_key VARCHAR(128) UNIQUE,
///     requested_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     result JSONB,
///     error TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     started_at TIMESTAMPTZ,
///     finished_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub(crate) const JOB_COLUMNS: &str = "id, kind, payload, state, dedupe_key, requested_by, \
                                      result, error, created_at, started_at, finished_at";

/// What a job does, with its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    /// Email one user their month-to-date report
    MonthlyReport { user_id: Uuid },

    /// Income/expense totals for every user over the last 7 days
    WeeklySummary,

    /// Delete transactions past the retention window
    Cleanup,
}

impl JobPayload {
    /// Value stored in the `kind` column
    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::MonthlyReport { .. } => "monthly_report",
            JobPayload::WeeklySummary => "weekly_summary",
            JobPayload::Cleanup => "cleanup",
        }
    }
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Error for an unknown state string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job state '{0}'")]
pub struct ParseJobStateError(pub String);

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    /// Finished one way or the other
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = ParseJobStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            other => Err(ParseJobStateError(other.to_string())),
        }
    }
}

impl TryFrom<String> for JobState {
    type Error = ParseJobStateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A queued or finished job
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,

    pub kind: String,

    /// Serialized [`JobPayload`]
    pub payload: JsonValue,

    #[sqlx(try_from = "String")]
    pub state: JobState,

    pub dedupe_key: Option<String>,

    /// User who asked for the job (None for scheduled jobs)
    pub requested_by: Option<Uuid>,

    /// Job output on success
    pub result: Option<JsonValue>,

    /// Error text on failure
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,
}

/// Input for enqueueing a job
#[derive(Debug, Clone)]
pub struct NewJob {
    pub payload: JobPayload,
    pub dedupe_key: Option<String>,
    pub requested_by: Option<Uuid>,
}

impl NewJob {
    /// A job with no dedupe key
    pub fn new(payload: JobPayload) -> Self {
        Self {
            payload,
            dedupe_key: None,
            requested_by: None,
        }
    }

    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn requested_by(mut self, user_id: Uuid) -> Self {
        self.requested_by = Some(user_id);
        self
    }
}

impl Job {
    /// Decodes the stored payload
    pub fn payload(&self) -> Result<JobPayload, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Inserts a pending job
    ///
    /// Returns None when a job with the same dedupe key already exists.
    pub async fn enqueue(pool: &PgPool, job: NewJob) -> Result<Option<Self>, sqlx::Error> {
        let payload = serde_json::to_value(&job.payload)
            .map_err(|e| sqlx::Error::Protocol(format!("Failed to encode job payload: {e}")))?;

        let query = format!(
            "INSERT INTO jobs (kind, payload, dedupe_key, requested_by) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (dedupe_key) DO NOTHING \
             RETURNING {JOB_COLUMNS}"
        );

        sqlx::query_as::<_, Job>(&query)
            .bind(job.payload.kind())
            .bind(payload)
            .bind(job.dedupe_key)
            .bind(job.requested_by)
            .fetch_optional(pool)
            .await
    }

    /// Finds a job by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");

        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a job by its dedupe key
    pub async fn find_by_dedupe_key(pool: &PgPool, key: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE dedupe_key = $1");

        sqlx::query_as::<_, Job>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Finds a job the given user enqueued
    pub async fn find_for_requester(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1 AND requested_by = $2");

        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically moves up to `limit` pending jobs to running
    ///
    /// Oldest first. Concurrent callers never receive the same row.
    pub async fn claim_pending(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "WITH claimable AS ( \
                 SELECT id FROM jobs \
                 WHERE state = 'pending' \
                 ORDER BY created_at ASC \
                 LIMIT $1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             UPDATE jobs SET state = 'running', started_at = NOW() \
             FROM claimable \
             WHERE jobs.id = claimable.id \
             RETURNING {}",
            qualified_columns()
        );

        sqlx::query_as::<_, Job>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Marks a running job as succeeded with its output
    pub async fn mark_succeeded(
        pool: &PgPool,
        id: Uuid,
        result: JsonValue,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'succeeded', result = $2, finished_at = NOW()
            WHERE id = $1 AND state = 'running'
            "#,
        )
        .bind(id)
        .bind(result)
        .execute(pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    /// Marks a running job as failed
    pub async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'failed', error = $2, finished_at = NOW()
            WHERE id = $1 AND state = 'running'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    /// Fails jobs that have been running longer than `older_than`
    ///
    /// A worker that crashed or was force-stopped leaves its jobs in
    /// `running`; nothing else would ever finish them.
    pub async fn fail_stale_running(
        pool: &PgPool,
        older_than: std::time::Duration,
    ) -> Result<u64, sqlx::Error> {
        let error = format!("Job abandoned after running for over {}s", older_than.as_secs());

        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'failed', error = $2, finished_at = NOW()
            WHERE state = 'running'
              AND started_at < NOW() - make_interval(secs => $1)
            "#,
        )
        .bind(older_than.as_secs_f64())
        .bind(&error)
        .execute(pool)
        .await?;

        Ok(outcome.rows_affected())
    }

    /// Deletes succeeded and failed jobs that finished before `cutoff`
    pub async fn purge_finished_before(pool: &PgPool, cutoff: NaiveDate) -> Result<u64, sqlx::Error> {
        let outcome = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE state IN ('succeeded', 'failed')
              AND finished_at < $1::date
            "#,
        )
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(outcome.rows_affected())
    }

    /// Number of jobs waiting to be claimed
    pub async fn pending_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state = 'pending'")
            .fetch_one(pool)
            .await
    }
}

/// `jobs.`-prefixed column list for UPDATE ... FROM ... RETURNING
fn qualified_columns() -> String {
    JOB_COLUMNS
        .split(", ")
        .map(|c| format!("jobs.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_serialization_is_tagged() {
        let user_id = Uuid::new_v4();
        let payload = JobPayload::MonthlyReport { user_id };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"kind": "monthly_report", "user_id": user_id}));
        assert_eq!(payload.kind(), "monthly_report");

        let cleanup: JobPayload = serde_json::from_value(json!({"kind": "cleanup"})).unwrap();
        assert_eq!(cleanup, JobPayload::Cleanup);
    }

    #[test]
    fn test_job_state_terminal() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert_eq!("running".parse::<JobState>(), Ok(JobState::Running));
    }

    #[test]
    fn test_qualified_columns() {
        let cols = qualified_columns();
        assert!(cols.starts_with("jobs.id, jobs.kind"));
        assert!(cols.ends_with("jobs.finished_at"));
    }

    #[test]
    fn test_new_job_builder() {
        let user_id = Uuid::new_v4();
        let job = NewJob::new(JobPayload::Cleanup)
            .with_dedupe_key("cleanup:2024-01-31")
            .requested_by(user_id);

        assert_eq!(job.dedupe_key.as_deref(), Some("cleanup:2024-01-31"));
        assert_eq!(job.requested_by, Some(user_id));
    }
}
