/// Job implementations
///
/// Each job is a plain async function over a [`JobContext`] returning a JSON
/// result that is stored on the job row. [`execute`] dispatches a decoded
/// [`JobPayload`] to the matching function.

pub mod cleanup;
pub mod monthly_report;
pub mod weekly_summary;

use crate::mail::{MailError, Mailer};
use casho_shared::{models::job::JobPayload, stats::StatsError};
use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Default job timeout plus the shutdown grace period
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(330);

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Window(#[from] StatsError),
}

/// Everything a job needs to run
#[derive(Clone)]
pub struct JobContext {
    pub db: PgPool,
    pub mailer: Arc<dyn Mailer>,
    /// Sender address for outgoing mail
    pub mail_from: String,
    /// Running jobs older than this are treated as abandoned
    pub stale_after: Duration,
}

impl JobContext {
    pub fn new(db: PgPool, mailer: Arc<dyn Mailer>, mail_from: impl Into<String>) -> Self {
        Self {
            db,
            mailer,
            mail_from: mail_from.into(),
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }
}

/// Runs one job as of `today`
pub async fn execute(
    ctx: &JobContext,
    payload: &JobPayload,
    today: NaiveDate,
) -> Result<JsonValue, JobError> {
    match payload {
        JobPayload::MonthlyReport { user_id } => {
            let message = monthly_report::run(ctx, *user_id, today).await?;
            Ok(JsonValue::String(message))
        }
        JobPayload::WeeklySummary => {
            let summary = weekly_summary::run(&ctx.db, today).await?;
            Ok(serde_json::to_value(summary)?)
        }
        JobPayload::Cleanup => {
            let report = cleanup::run(&ctx.db, today, ctx.stale_after).await?;
            Ok(serde_json::to_value(report)?)
        }
    }
}
