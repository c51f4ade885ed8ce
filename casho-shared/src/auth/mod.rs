/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: access/refresh token issuing and validation
/// - [`middleware`]: bearer-token extraction into an [`middleware::AuthContext`]
///
/// Access tokens live 24 hours, refresh tokens 30 days. Every token carries a
/// `jti` so a refresh token can be blacklisted on logout.

pub mod jwt;
pub mod middleware;
pub mod password;
