/// Report jobs
///
/// - `POST /api/reports/monthly/` - queue a month-to-date report email for
///   the caller; responds 202 with the job. At most one per user per day:
///   repeated requests get the job already queued that day
/// - `GET /api/jobs/<id>/` - status of a job the caller queued

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use casho_shared::{
    auth::middleware::AuthContext,
    models::job::{Job, JobPayload, JobState, NewJob},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Job as seen by the user who queued it
#[derive(Debug, Serialize)]
pub struct JobStatus {
    pub id: Uuid,
    pub kind: String,
    pub state: JobState,
    pub result: Option<JsonValue>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobStatus {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            state: job.state,
            result: job.result,
            error: job.error,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

/// Dedupe key for a report requested by `user_id` on `day`
pub fn manual_report_key(user_id: Uuid, day: NaiveDate) -> String {
    format!("monthly_report:manual:{user_id}:{day}")
}

pub async fn request_monthly_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<(StatusCode, Json<JobStatus>)> {
    let key = manual_report_key(auth.user_id, Utc::now().date_naive());

    let inserted = Job::enqueue(
        &state.db,
        NewJob::new(JobPayload::MonthlyReport {
            user_id: auth.user_id,
        })
        .with_dedupe_key(key.clone())
        .requested_by(auth.user_id),
    )
    .await?;

    let job = match inserted {
        Some(job) => {
            tracing::info!(job_id = %job.id, user_id = %auth.user_id, "Monthly report queued");
            job
        }
        None => Job::find_by_dedupe_key(&state.db, &key)
            .await?
            .ok_or_else(|| ApiError::InternalError(format!("Job with key {key} vanished")))?,
    };

    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

pub async fn get_job(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobStatus>> {
    Job::find_for_requester(&state.db, id, auth.user_id)
        .await?
        .map(|job| Json(job.into()))
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}
