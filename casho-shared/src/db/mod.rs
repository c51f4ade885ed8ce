/// Database layer for Casho
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Schema migrations embedded from the workspace `migrations/` directory
///
/// Models live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
