//! # Casho Worker Library
//!
//! Background jobs for Casho: a Postgres-backed queue, a scheduler for the
//! recurring jobs and the executor that runs them.
//!
//! ## Modules
//!
//! - `config`: Worker settings (`CASHO_WORKER_*`)
//! - `jobs`: Monthly report, weekly summary and cleanup
//! - `mail`: The `Mailer` transport trait and its implementations
//! - `orchestrator`: Scheduling and execution loop
//! - `queue`: Claiming and finishing jobs
//! - `scheduler`: Which recurring jobs are due on a given day

pub mod config;
pub mod jobs;
pub mod mail;
pub mod orchestrator;
pub mod queue;
pub mod scheduler;
