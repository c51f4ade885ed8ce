/// Worker orchestrator
///
/// Runs the scheduler and the job executor in one loop:
///
/// ```text
/// WorkerOrchestrator
///   ├─> Scheduler: enqueue due recurring jobs (every schedule interval)
///   ├─> JobQueue: claim pending jobs (every poll interval, up to free slots)
///   ├─> jobs::execute: run each claimed job on its own Tokio task
///   └─> JobQueue: record succeeded/failed
/// ```
///
/// Each job runs under a timeout; a job that exceeds it is failed. On
/// shutdown no new jobs are claimed and running ones get a grace period.
/// Jobs a previous worker left in `running` are failed at startup.
///
/// # Example
///
/// ```no_run
/// use casho_worker::{jobs::JobContext, mail::LogMailer, orchestrator::WorkerOrchestrator};
/// use std::sync::Arc;
///
/// # async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
/// let ctx = JobContext::new(pool, Arc::new(LogMailer), "noreply@casho.app");
/// let orchestrator = WorkerOrchestrator::new(ctx);
/// orchestrator.run().await?;
/// # Ok(())
/// # }
/// ```

use crate::config::WorkerConfig;
use crate::jobs::{self, JobContext};
use crate::queue::JobQueue;
use crate::scheduler::Scheduler;
use casho_shared::models::job::Job;
use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// How long running jobs may take to finish after shutdown is requested
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub schedule_interval: Duration,
    pub max_concurrent_jobs: usize,
    pub batch_size: usize,
    pub job_timeout: Duration,
    pub scheduler_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            poll_interval: Duration::from_secs(5),
            schedule_interval: Duration::from_secs(60),
            max_concurrent_jobs: 4,
            batch_size: 5,
            job_timeout: Duration::from_secs(300),
            scheduler_enabled: true,
        }
    }
}

impl From<&WorkerConfig> for OrchestratorConfig {
    fn from(config: &WorkerConfig) -> Self {
        OrchestratorConfig {
            poll_interval: config.poll_interval(),
            schedule_interval: config.schedule_interval(),
            max_concurrent_jobs: config.max_concurrent_jobs,
            batch_size: config.batch_size,
            job_timeout: config.job_timeout(),
            scheduler_enabled: config.scheduler_enabled,
        }
    }
}

pub struct WorkerOrchestrator {
    ctx: JobContext,
    queue: JobQueue,
    scheduler: Scheduler,
    config: OrchestratorConfig,
    shutdown_token: CancellationToken,
}

impl WorkerOrchestrator {
    pub fn new(ctx: JobContext) -> Self {
        Self::with_config(ctx, OrchestratorConfig::default())
    }

    pub fn with_config(ctx: JobContext, config: OrchestratorConfig) -> Self {
        let queue = JobQueue::with_batch_size(ctx.db.clone(), config.batch_size);
        let scheduler = Scheduler::new(ctx.db.clone(), queue.clone());

        WorkerOrchestrator {
            ctx,
            queue,
            scheduler,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancel this token to stop [`run`](Self::run)
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Runs until the shutdown token is cancelled
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            scheduler = self.config.scheduler_enabled,
            max_concurrent = self.config.max_concurrent_jobs,
            mailer = self.ctx.mailer.name(),
            "Worker orchestrator starting"
        );

        if let Err(e) = self.queue.reap_stale(self.ctx.stale_after).await {
            tracing::error!(error = %e, "Failed to reap stale jobs");
        }

        let mut running: JoinSet<()> = JoinSet::new();

        let mut schedule_tick = interval(self.config.schedule_interval);
        schedule_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll_tick = interval(self.config.poll_interval);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,

                _ = schedule_tick.tick(), if self.config.scheduler_enabled => {
                    if let Err(e) = self.scheduler.tick(Utc::now().date_naive()).await {
                        tracing::error!(error = %e, "Scheduler tick failed");
                    }
                }

                _ = poll_tick.tick() => {
                    let free = self.config.max_concurrent_jobs.saturating_sub(running.len());
                    if free > 0 {
                        self.dispatch(&mut running, free.min(self.config.batch_size)).await;
                    }
                }

                Some(joined) = running.join_next(), if !running.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Job task panicked");
                    }
                }
            }
        }

        tracing::info!(running = running.len(), "Shutdown requested, waiting for running jobs");

        let drain = async { while running.join_next().await.is_some() {} };
        if timeout(SHUTDOWN_GRACE_PERIOD, drain).await.is_err() {
            tracing::warn!(count = running.len(), "Force shutdown with jobs still running");
            running.abort_all();
        }

        tracing::info!("Worker orchestrator shut down");
        Ok(())
    }

    async fn dispatch(&self, running: &mut JoinSet<()>, limit: usize) {
        let claimed = match self.queue.claim(Some(limit)).await {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim jobs");
                return;
            }
        };

        for job in claimed {
            let ctx = self.ctx.clone();
            let queue = self.queue.clone();
            let job_timeout = self.config.job_timeout;
            running.spawn(async move {
                process_job(&ctx, &queue, job, job_timeout).await;
            });
        }
    }

    /// Claims one batch and runs it to completion; returns the number of jobs run
    pub async fn run_once(&self) -> anyhow::Result<usize> {
        let claimed = self.queue.claim(None).await?;
        let count = claimed.len();

        for job in claimed {
            process_job(&self.ctx, &self.queue, job, self.config.job_timeout).await;
        }

        Ok(count)
    }
}

/// Executes a claimed job and records the outcome; never retries
pub async fn process_job(ctx: &JobContext, queue: &JobQueue, job: Job, job_timeout: Duration) {
    let job_id = job.id;

    let outcome = match job.payload() {
        Ok(payload) => {
            let today = Utc::now().date_naive();
            match timeout(job_timeout, jobs::execute(ctx, &payload, today)).await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("Job timed out after {}s", job_timeout.as_secs())),
            }
        }
        Err(e) => Err(format!("Invalid job payload: {e}")),
    };

    let recorded = match outcome {
        Ok(result) => {
            tracing::info!(job_id = %job_id, kind = %job.kind, "Job succeeded");
            queue.mark_succeeded(job_id, result).await
        }
        Err(error) => {
            tracing::error!(job_id = %job_id, kind = %job.kind, error = %error, "Job failed");
            queue.mark_failed(job_id, &error).await
        }
    };

    if let Err(e) = recorded {
        tracing::error!(job_id = %job_id, error = %e, "Failed to record job outcome");
    }
}
