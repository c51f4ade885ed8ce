//! # Casho Worker
//!
//! Enqueues the recurring jobs (daily cleanup, Monday weekly summary,
//! month-end reports) and executes queued jobs, including reports requested
//! through the API.
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/casho cargo run -p casho-worker
//! ```

use casho_shared::db::{migrations::run_migrations, pool};
use casho_worker::{
    config::WorkerConfig,
    jobs::JobContext,
    mail::{HttpMailer, LogMailer, Mailer},
    orchestrator::{OrchestratorConfig, WorkerOrchestrator, SHUTDOWN_GRACE_PERIOD},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "casho_worker=info,casho_shared=info".into());

    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Casho Worker v{} starting", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::load()?;

    let db = pool::create_pool(pool::DatabaseConfig {
        max_connections: (config.max_concurrent_jobs as u32) + 2,
        ..pool::DatabaseConfig::new(config.database_url.clone())
    })
    .await?;

    run_migrations(&db).await?;

    let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone())?),
        None => Arc::new(LogMailer),
    };

    let ctx = JobContext::new(db, mailer, config.mail_from.clone())
        .with_stale_after(config.job_timeout() + SHUTDOWN_GRACE_PERIOD);
    let orchestrator = WorkerOrchestrator::with_config(ctx, OrchestratorConfig::from(&config));

    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        shutdown.cancel();
    });

    orchestrator.run().await
}
