/// Accounts hold a balance in one currency
///
/// Transactions may optionally point at an account. The balance is the
/// value the user entered; it is not recomputed from transactions.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     currency VARCHAR(10) NOT NULL CHECK (currency IN ('USD', 'CAD', 'CNY')),
///     balance NUMERIC(14, 2) NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT accounts_name_user_key UNIQUE (name, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, user_id, name, currency, balance, created_at, updated_at";

/// Supported account currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Cad,
    Cny,
}

/// Error returned for an unsupported currency code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported currency '{0}': expected one of USD, CAD, CNY")]
pub struct ParseCurrencyError(pub String);

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Cad, Currency::Cny];

    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cad => "CAD",
            Currency::Cny => "CNY",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Currency::Usd => "US Dollar",
            Currency::Cad => "Canadian Dollar",
            Currency::Cny => "Chinese Yuan",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| ParseCurrencyError(s.to_string()))
    }
}

impl TryFrom<String> for Currency {
    type Error = ParseCurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A named, currency-denominated balance holder
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,

    #[serde(skip_serializing)]
    pub user_id: Uuid,

    pub name: String,

    #[sqlx(try_from = "String")]
    pub currency: Currency,

    pub balance: Decimal,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub user_id: Uuid,
    pub name: String,
    pub currency: Currency,
    /// Defaults to zero
    pub balance: Option<Decimal>,
}

/// Partial account update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccount {
    pub name: Option<String>,
    pub currency: Option<Currency>,
    pub balance: Option<Decimal>,
}

impl Account {
    /// Inserts an account
    ///
    /// # Errors
    ///
    /// Unique violation on `accounts_name_user_key` for a duplicate name.
    pub async fn create(pool: &PgPool, data: CreateAccount) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO accounts (user_id, name, currency, balance) \
             VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(data.user_id)
            .bind(data.name)
            .bind(data.currency.code())
            .bind(data.balance.unwrap_or(Decimal::ZERO))
            .fetch_one(pool)
            .await
    }

    /// Finds an account owned by `user_id`
    pub async fn find_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 AND user_id = $2");

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's accounts, optionally filtered by currency
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        currency: Option<Currency>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE user_id = $1 AND ($2::text IS NULL OR currency = $2) \
             ORDER BY name ASC"
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(user_id)
            .bind(currency.map(|c| c.code()))
            .fetch_all(pool)
            .await
    }

    /// Partial update scoped to the owner
    pub async fn update_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateAccount,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE accounts SET \
                 name = COALESCE($3, name), \
                 currency = COALESCE($4, currency), \
                 balance = COALESCE($5, balance), \
                 updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {ACCOUNT_COLUMNS}"
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(user_id)
            .bind(data.name)
            .bind(data.currency.map(|c| c.code()))
            .bind(data.balance)
            .fetch_optional(pool)
            .await
    }

    /// Deletes an account (and transactions booked on it) scoped to the owner
    pub async fn delete_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
