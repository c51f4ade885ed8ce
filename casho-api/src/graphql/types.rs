/// GraphQL object and input types

use async_graphql::{Enum, InputObject, SimpleObject};
use casho_shared::{
    models::{
        account::{Account, Currency},
        category::{Category, CategoryKind},
        transaction::Transaction,
        user::User,
    },
    stats::{CategoryTotal, Stats},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "TransactionType", rename_items = "lowercase")]
pub enum GqlKind {
    Income,
    Expense,
}

impl From<CategoryKind> for GqlKind {
    fn from(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::Income => GqlKind::Income,
            CategoryKind::Expense => GqlKind::Expense,
        }
    }
}

impl From<GqlKind> for CategoryKind {
    fn from(kind: GqlKind) -> Self {
        match kind {
            GqlKind::Income => CategoryKind::Income,
            GqlKind::Expense => CategoryKind::Expense,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "Currency", rename_items = "UPPERCASE")]
pub enum GqlCurrency {
    Usd,
    Cad,
    Cny,
}

impl From<Currency> for GqlCurrency {
    fn from(currency: Currency) -> Self {
        match currency {
            Currency::Usd => GqlCurrency::Usd,
            Currency::Cad => GqlCurrency::Cad,
            Currency::Cny => GqlCurrency::Cny,
        }
    }
}

impl From<GqlCurrency> for Currency {
    fn from(currency: GqlCurrency) -> Self {
        match currency {
            GqlCurrency::Usd => Currency::Usd,
            GqlCurrency::Cad => Currency::Cad,
            GqlCurrency::Cny => Currency::Cny,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "User")]
pub struct GqlUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for GqlUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Category")]
pub struct GqlCategory {
    pub id: Uuid,
    pub name: String,
    #[graphql(name = "type")]
    pub kind: GqlKind,
    pub icon: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl From<Category> for GqlCategory {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            kind: category.kind.into(),
            icon: category.icon,
            color: category.color,
            created_at: category.created_at,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Account")]
pub struct GqlAccount {
    pub id: Uuid,
    pub name: String,
    pub currency: GqlCurrency,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for GqlAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            currency: account.currency.into(),
            balance: account.balance,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Transaction")]
pub struct GqlTransaction {
    pub id: Uuid,
    pub category_id: Uuid,
    pub account_id: Option<Uuid>,
    #[graphql(name = "type")]
    pub kind: GqlKind,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub category_name: String,
    pub category_icon: String,
    pub category_color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for GqlTransaction {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            category_id: tx.category_id,
            account_id: tx.account_id,
            kind: tx.kind.into(),
            amount: tx.amount,
            description: tx.description,
            date: tx.transaction_date,
            category_name: tx.category_name,
            category_icon: tx.category_icon,
            category_color: tx.category_color,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "CategoryTotal")]
pub struct GqlCategoryTotal {
    pub name: String,
    #[graphql(name = "type")]
    pub kind: GqlKind,
    pub total: Decimal,
}

impl From<CategoryTotal> for GqlCategoryTotal {
    fn from(total: CategoryTotal) -> Self {
        Self {
            name: total.name,
            kind: total.kind.into(),
            total: total.total,
        }
    }
}

/// Category name with its total across both types
#[derive(SimpleObject)]
#[graphql(name = "CategoryAmount")]
pub struct GqlCategoryAmount {
    pub name: String,
    pub total: Decimal,
}

#[derive(SimpleObject)]
#[graphql(name = "Stats")]
pub struct GqlStats {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub income_total: Decimal,
    pub expense_total: Decimal,
    pub balance: Decimal,
    /// One entry per category name, ordered by name
    pub category_stats: Vec<GqlCategoryAmount>,
    /// Per category and type, largest first
    pub category_breakdown: Vec<GqlCategoryTotal>,
}

impl From<Stats> for GqlStats {
    fn from(stats: Stats) -> Self {
        Self {
            period: stats.period,
            start_date: stats.start_date,
            end_date: stats.end_date,
            income_total: stats.income_total,
            expense_total: stats.expense_total,
            balance: stats.balance,
            category_stats: stats
                .category_stats
                .into_iter()
                .map(|(name, total)| GqlCategoryAmount { name, total })
                .collect(),
            category_breakdown: stats.category_breakdown.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(SimpleObject)]
pub struct AuthPayload {
    pub user: GqlUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(SimpleObject)]
pub struct RefreshPayload {
    pub access_token: String,
}

#[derive(SimpleObject)]
pub struct VerifyPayload {
    pub user_id: Uuid,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(InputObject)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub phone: Option<String>,
}

#[derive(InputObject)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(InputObject)]
pub struct CategoryInput {
    pub name: String,
    #[graphql(name = "type")]
    pub kind: GqlKind,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(InputObject)]
pub struct TransactionInput {
    pub category_id: Uuid,
    pub account_id: Option<Uuid>,
    /// Copied from the category when omitted
    #[graphql(name = "type")]
    pub kind: Option<GqlKind>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: NaiveDate,
}

#[derive(InputObject)]
pub struct AccountInput {
    pub name: String,
    pub currency: GqlCurrency,
    pub balance: Option<Decimal>,
}
