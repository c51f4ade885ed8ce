/// Worker configuration
///
/// Built-in defaults are overridden by `CASHO_WORKER_*` environment
/// variables (e.g. `CASHO_WORKER_POLL_INTERVAL_SECS=2`). The database URL
/// is read from `DATABASE_URL`, shared with the API server.
///
/// | Variable | Default |
/// |---|---|
/// | `CASHO_WORKER_POLL_INTERVAL_SECS` | 5 |
/// | `CASHO_WORKER_SCHEDULE_INTERVAL_SECS` | 60 |
/// | `CASHO_WORKER_BATCH_SIZE` | 5 |
/// | `CASHO_WORKER_MAX_CONCURRENT_JOBS` | 4 |
/// | `CASHO_WORKER_JOB_TIMEOUT_SECS` | 300 |
/// | `CASHO_WORKER_SCHEDULER_ENABLED` | true |
/// | `CASHO_WORKER_MAIL_FROM` | `Casho <noreply@casho.app>` |
/// | `CASHO_WORKER_MAIL_RELAY_URL` | unset (log transport) |

use config::{Config, Environment};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub database_url: String,

    /// Seconds between queue polls when idle
    pub poll_interval_secs: u64,

    /// Seconds between scheduler ticks
    pub schedule_interval_secs: u64,

    /// Jobs claimed per poll
    pub batch_size: usize,

    pub max_concurrent_jobs: usize,

    /// A job running longer than this is failed
    pub job_timeout_secs: u64,

    /// Disable to run a pure executor next to another scheduling worker
    pub scheduler_enabled: bool,

    pub mail_from: String,

    /// JSON mail relay endpoint; the log transport is used when unset
    pub mail_relay_url: Option<String>,
}

impl WorkerConfig {
    /// Loads defaults, `.env` and the environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("poll_interval_secs", 5)?
            .set_default("schedule_interval_secs", 60)?
            .set_default("batch_size", 5)?
            .set_default("max_concurrent_jobs", 4)?
            .set_default("job_timeout_secs", 300)?
            .set_default("scheduler_enabled", true)?
            .set_default("mail_from", "Casho <noreply@casho.app>")?
            .add_source(Environment::with_prefix("CASHO_WORKER").try_parsing(true))
            .set_override_option("database_url", std::env::var("DATABASE_URL").ok())?
            .build()?;

        let worker: WorkerConfig = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Invalid worker configuration: {e}"))?;

        worker.validate()?;
        Ok(worker)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL environment variable is required");
        }
        if self.batch_size == 0 || self.max_concurrent_jobs == 0 {
            anyhow::bail!("batch_size and max_concurrent_jobs must be greater than zero");
        }
        if self.job_timeout_secs == 0 {
            anyhow::bail!("job_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            poll_interval_secs: 5,
            schedule_interval_secs: 60,
            batch_size: 5,
            max_concurrent_jobs: 4,
            job_timeout_secs: 300,
            scheduler_enabled: true,
            mail_from: "Casho <noreply@casho.app>".to_string(),
            mail_relay_url: None,
        }
    }
}
