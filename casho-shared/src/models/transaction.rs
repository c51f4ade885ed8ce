/// Transactions are dated money movements
///
/// Each transaction references one category (and optionally one account)
/// of the same user. Reads always join the category so responses can show
/// its name, icon and color next to the amount.
///
/// Creation goes through [`crate::ledger::record_transaction`], which
/// performs the ownership checks and fills in the kind from the category.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE transactions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     account_id UUID REFERENCES accounts(id) ON DELETE CASCADE,
///     category_id UUID NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
///     kind VARCHAR(10) NOT NULL,
///     amount NUMERIC(10, 2) NOT NULL CHECK (amount > 0),
///     description VARCHAR(200) NOT NULL DEFAULT '',
///     transaction_date DATE NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use super::category::CategoryKind;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;

const DETAIL_SELECT: &str = "SELECT t.id, t.user_id, t.account_id, t.category_id, t.kind, \
                             t.amount, t.description, t.transaction_date, t.created_at, \
                             t.updated_at, c.name AS category_name, c.icon AS category_icon, \
                             c.color AS category_color";

/// A transaction joined with its category's display fields
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,

    #[serde(skip_serializing)]
    pub user_id: Uuid,

    #[serde(rename = "account")]
    pub account_id: Option<Uuid>,

    #[serde(rename = "category")]
    pub category_id: Uuid,

    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub kind: CategoryKind,

    pub amount: Decimal,

    pub description: String,

    #[serde(rename = "date")]
    pub transaction_date: NaiveDate,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub category_name: String,

    pub category_icon: String,

    pub category_color: String,
}

/// Row to insert; the kind is already resolved
#[derive(Debug, Clone)]
pub struct InsertTransaction {
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    pub category_id: Uuid,
    pub kind: CategoryKind,
    pub amount: Decimal,
    pub description: String,
    pub transaction_date: NaiveDate,
}

/// Columns to overwrite on update
///
/// `account_id: Some(None)` detaches the transaction from its account.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransaction {
    pub account_id: Option<Option<Uuid>>,
    pub category_id: Option<Uuid>,
    pub kind: Option<CategoryKind>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
}

/// Sortable columns for transaction lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Amount,
    Date,
    CreatedAt,
}

/// Requested list ordering, e.g. `-amount`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOrdering {
    pub field: OrderField,
    pub descending: bool,
}

/// Error for an ordering outside the allowed columns
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid ordering '{0}': expected amount, date or created_at, optionally prefixed with '-'")]
pub struct ParseOrderingError(pub String);

impl Default for TransactionOrdering {
    /// Newest first
    fn default() -> Self {
        Self {
            field: OrderField::Date,
            descending: true,
        }
    }
}

impl FromStr for TransactionOrdering {
    type Err = ParseOrderingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let field = match name {
            "amount" => OrderField::Amount,
            "date" => OrderField::Date,
            "created_at" => OrderField::CreatedAt,
            _ => return Err(ParseOrderingError(s.to_string())),
        };

        Ok(Self { field, descending })
    }
}

impl TransactionOrdering {
    /// ORDER BY clause body; only whitelisted column names reach SQL
    pub fn sql(&self) -> String {
        let dir = if self.descending { "DESC" } else { "ASC" };
        match self.field {
            OrderField::Amount => format!("t.amount {dir}, t.transaction_date DESC, t.created_at DESC"),
            OrderField::Date => format!("t.transaction_date {dir}, t.created_at {dir}"),
            OrderField::CreatedAt => format!("t.created_at {dir}"),
        }
    }
}

/// List filters; every `Some` field narrows the result
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<CategoryKind>,
    pub category_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    /// Exact date
    pub date: Option<NaiveDate>,
    /// Inclusive lower bound
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring of the description
    pub search: Option<String>,
    pub ordering: TransactionOrdering,
}

impl Transaction {
    /// Inserts a row and returns it with category fields
    pub async fn insert(pool: &PgPool, data: InsertTransaction) -> Result<Self, sqlx::Error> {
        let query = format!(
            "WITH t AS ( \
                 INSERT INTO transactions \
                     (user_id, account_id, category_id, kind, amount, description, transaction_date) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 RETURNING * \
             ) \
             {DETAIL_SELECT} FROM t JOIN categories c ON c.id = t.category_id"
        );

        sqlx::query_as::<_, Transaction>(&query)
            .bind(data.user_id)
            .bind(data.account_id)
            .bind(data.category_id)
            .bind(data.kind.as_str())
            .bind(data.amount)
            .bind(data.description)
            .bind(data.transaction_date)
            .fetch_one(pool)
            .await
    }

    /// Finds a transaction owned by `user_id`
    pub async fn find_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT} FROM transactions t JOIN categories c ON c.id = t.category_id \
             WHERE t.id = $1 AND t.user_id = $2"
        );

        sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's transactions matching `filter`
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(DETAIL_SELECT);
        qb.push(" FROM transactions t JOIN categories c ON c.id = t.category_id WHERE t.user_id = ");
        qb.push_bind(user_id);

        if let Some(kind) = filter.kind {
            qb.push(" AND t.kind = ").push_bind(kind.as_str());
        }
        if let Some(category_id) = filter.category_id {
            qb.push(" AND t.category_id = ").push_bind(category_id);
        }
        if let Some(account_id) = filter.account_id {
            qb.push(" AND t.account_id = ").push_bind(account_id);
        }
        if let Some(date) = filter.date {
            qb.push(" AND t.transaction_date = ").push_bind(date);
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND t.transaction_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND t.transaction_date <= ").push_bind(end);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND t.description ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }

        qb.push(" ORDER BY ").push(filter.ordering.sql());

        qb.build_query_as::<Transaction>().fetch_all(pool).await
    }

    /// Overwrites the given columns, scoped to the owner
    ///
    /// Ownership of a new category/account must already be verified.
    pub async fn update_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateTransaction,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "WITH t AS ( \
                 UPDATE transactions SET \
                     account_id = CASE WHEN $3 THEN $4 ELSE account_id END, \
                     category_id = COALESCE($5, category_id), \
                     kind = COALESCE($6, kind), \
                     amount = COALESCE($7, amount), \
                     description = COALESCE($8, description), \
                     transaction_date = COALESCE($9, transaction_date), \
                     updated_at = NOW() \
                 WHERE id = $1 AND user_id = $2 \
                 RETURNING * \
             ) \
             {DETAIL_SELECT} FROM t JOIN categories c ON c.id = t.category_id"
        );

        let (set_account, account_id) = match data.account_id {
            Some(account_id) => (true, account_id),
            None => (false, None),
        };

        sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .bind(user_id)
            .bind(set_account)
            .bind(account_id)
            .bind(data.category_id)
            .bind(data.kind.map(|k| k.as_str()))
            .bind(data.amount)
            .bind(data.description)
            .bind(data.transaction_date)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a transaction scoped to the owner
    pub async fn delete_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every transaction dated strictly before `cutoff`
    ///
    /// Returns the number of rows removed.
    pub async fn delete_dated_before(pool: &PgPool, cutoff: NaiveDate) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM transactions WHERE transaction_date < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Escapes `%`, `_` and `\` for use inside an ILIKE pattern
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
