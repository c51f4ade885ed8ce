/// Categories label transactions as income or expense
///
/// A category belongs to one user. `(name, user_id, kind)` is unique, so a
/// user may have an "Other" income category and an "Other" expense category.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     kind VARCHAR(10) NOT NULL CHECK (kind IN ('income', 'expense')),
///     icon VARCHAR(50) NOT NULL DEFAULT '',
///     color VARCHAR(7) NOT NULL DEFAULT '#000000',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT categories_name_user_kind_key UNIQUE (name, user_id, kind)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default display color for new categories
pub const DEFAULT_COLOR: &str = "#000000";

const CATEGORY_COLUMNS: &str = "id, user_id, name, kind, icon, color, created_at";

/// Direction of money flow
///
/// Shared by categories and transactions; a transaction's kind is copied
/// from its category when not given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

/// Error returned when a string is not `income` or `expense`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid type '{0}': expected 'income' or 'expense'")]
pub struct ParseKindError(pub String);

impl CategoryKind {
    /// Database / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(CategoryKind::Income),
            "expense" => Ok(CategoryKind::Expense),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

impl TryFrom<String> for CategoryKind {
    type Error = ParseKindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A user-defined transaction label
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,

    /// Owner
    #[serde(skip_serializing)]
    pub user_id: Uuid,

    pub name: String,

    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub kind: CategoryKind,

    /// Icon name or emoji
    pub icon: String,

    /// `#RRGGBB`
    pub color: String,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategory {
    pub user_id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Partial category update
///
/// Changing `kind` does not touch existing transactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub kind: Option<CategoryKind>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl Category {
    /// Inserts a category for `data.user_id`
    ///
    /// # Errors
    ///
    /// Unique violation on `categories_name_user_kind_key` if the user
    /// already has a category with this name and kind.
    pub async fn create(pool: &PgPool, data: CreateCategory) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO categories (user_id, name, kind, icon, color) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CATEGORY_COLUMNS}"
        );

        sqlx::query_as::<_, Category>(&query)
            .bind(data.user_id)
            .bind(data.name)
            .bind(data.kind.as_str())
            .bind(data.icon.unwrap_or_default())
            .bind(data.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()))
            .fetch_one(pool)
            .await
    }

    /// Finds a category owned by `user_id`
    ///
    /// Another user's category is indistinguishable from a missing one.
    pub async fn find_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND user_id = $2");

        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's categories, optionally only one kind
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE user_id = $1 AND ($2::text IS NULL OR kind = $2) \
             ORDER BY created_at DESC, name ASC"
        );

        sqlx::query_as::<_, Category>(&query)
            .bind(user_id)
            .bind(kind.map(|k| k.as_str()))
            .fetch_all(pool)
            .await
    }

    /// Partial update scoped to the owner
    ///
    /// Returns None if the category does not exist or belongs to someone else.
    pub async fn update_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateCategory,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE categories SET \
                 name = COALESCE($3, name), \
                 kind = COALESCE($4, kind), \
                 icon = COALESCE($5, icon), \
                 color = COALESCE($6, color) \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {CATEGORY_COLUMNS}"
        );

        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(user_id)
            .bind(data.name)
            .bind(data.kind.map(|k| k.as_str()))
            .bind(data.icon)
            .bind(data.color)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a category (and its transactions) scoped to the owner
    pub async fn delete_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
