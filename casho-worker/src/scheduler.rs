/// Recurring job schedule
///
/// [`due_jobs`] is a pure function of the date and the user list; the
/// [`Scheduler`] enqueues its output on every tick. Dedupe keys make a tick
/// idempotent, so ticking every minute, restarting, or running several
/// workers never enqueues the same occurrence twice:
///
/// - cleanup, daily: `cleanup:<YYYY-MM-DD>`
/// - weekly summary, Mondays: `weekly_summary:<iso-year>-W<iso-week>`
/// - monthly report per user, last day of the month:
///   `monthly_report:<user-id>:<YYYY-MM>`

use crate::queue::{JobQueue, QueueError};
use casho_shared::models::{
    job::{JobPayload, NewJob},
    user::User,
};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use sqlx::PgPool;
use uuid::Uuid;

/// One occurrence of a recurring job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub dedupe_key: String,
    pub payload: JobPayload,
}

impl ScheduledJob {
    pub fn into_new_job(self) -> NewJob {
        NewJob::new(self.payload).with_dedupe_key(self.dedupe_key)
    }
}

pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    (date + Duration::days(1)).month() != date.month()
}

/// Jobs due on `today`
pub fn due_jobs(today: NaiveDate, users: &[Uuid]) -> Vec<ScheduledJob> {
    let mut jobs = vec![ScheduledJob {
        dedupe_key: format!("cleanup:{}", today.format("%Y-%m-%d")),
        payload: JobPayload::Cleanup,
    }];

    if today.weekday() == Weekday::Mon {
        let week = today.iso_week();
        jobs.push(ScheduledJob {
            dedupe_key: format!("weekly_summary:{}-W{:02}", week.year(), week.week()),
            payload: JobPayload::WeeklySummary,
        });
    }

    if is_last_day_of_month(today) {
        let month = today.format("%Y-%m");
        jobs.extend(users.iter().map(|user_id| ScheduledJob {
            dedupe_key: format!("monthly_report:{user_id}:{month}"),
            payload: JobPayload::MonthlyReport { user_id: *user_id },
        }));
    }

    jobs
}

pub struct Scheduler {
    db: PgPool,
    queue: JobQueue,
}

impl Scheduler {
    pub fn new(db: PgPool, queue: JobQueue) -> Self {
        Self { db, queue }
    }

    /// Enqueues everything due on `today`; returns how many were new
    pub async fn tick(&self, today: NaiveDate) -> Result<usize, QueueError> {
        let users = if is_last_day_of_month(today) {
            User::list_ids(&self.db).await?
        } else {
            Vec::new()
        };

        let mut enqueued = 0;
        for job in due_jobs(today, &users) {
            if self.queue.enqueue(job.into_new_job()).await?.is_some() {
                enqueued += 1;
            }
        }

        if enqueued > 0 {
            tracing::info!(%today, enqueued, "Scheduled jobs enqueued");
        }

        Ok(enqueued)
    }
}
