//! # Casho API Server Library
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `graphql`: The `/graphql` schema and handler
//! - `middleware`: Bearer-token authentication
//! - `routes`: REST handlers under `/api`

pub mod app;
pub mod config;
pub mod error;
pub mod graphql;
pub mod middleware;
pub mod routes;
