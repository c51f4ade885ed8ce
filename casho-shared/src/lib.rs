//! # Casho Shared Library
//!
//! Types and business rules shared by the Casho API server and the
//! background worker.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and schema migrations
//! - `models`: Database rows and their CRUD queries
//! - `auth`: Password hashing, JWT tokens and request authentication
//! - `ledger`: Ownership checks and category-type propagation for transactions
//! - `stats`: Income/expense aggregation over date ranges

pub mod auth;
pub mod db;
pub mod ledger;
pub mod models;
pub mod stats;

/// Current version of the Casho shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
