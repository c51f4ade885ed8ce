/// Database models and their queries
///
/// # Models
///
/// - `user`: accounts and login identity
/// - `category`: per-user income/expense categories
/// - `account`: per-user money accounts (USD/CAD/CNY)
/// - `transaction`: ledger entries, read back joined with their category
/// - `revoked_token`: refresh-token blacklist
/// - `job`: background job queue
///
/// Every per-user query scopes by `user_id`; a row owned by someone else is
/// indistinguishable from a missing one.
///
/// # Example
///
/// ```no_run
/// use casho_shared::models::user::{User, CreateUser};
/// use casho_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     username: "jane".to_string(),
///     email: "jane@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     phone: None,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod category;
pub mod job;
pub mod revoked_token;
pub mod transaction;
pub mod user;
