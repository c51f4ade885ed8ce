/// Middleware for the API server
///
/// - `auth`: bearer-token authentication for the REST routes

pub mod auth;
