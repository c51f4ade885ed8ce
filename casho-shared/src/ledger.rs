/// Transaction write rules
///
/// Every transaction write goes through here so the same checks apply to the
/// REST and GraphQL surfaces:
///
/// - the category must belong to the caller
/// - an account, when given, must belong to the caller
/// - the stored type always agrees with the category at write time: it is
///   copied from the category when omitted, and an explicit type that
///   disagrees is rejected
/// - amounts are positive with at most two decimal places
///
/// Editing a category's type later does not rewrite existing transactions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::account::Account;
use crate::models::category::{Category, CategoryKind};
use crate::models::transaction::{InsertTransaction, Transaction, UpdateTransaction};

/// Largest amount that fits NUMERIC(10,2), in cents
const MAX_AMOUNT_CENTS: i64 = 9_999_999_999;

/// Error type for ledger writes
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Category missing or owned by another user
    #[error("Category does not exist or does not belong to you")]
    CategoryNotFound,

    /// Account missing or owned by another user
    #[error("Account does not exist or does not belong to you")]
    AccountNotFound,

    /// Transaction missing or owned by another user
    #[error("Transaction not found")]
    TransactionNotFound,

    /// Explicit type disagrees with the category
    #[error("Transaction type '{requested}' does not match category type '{category}'")]
    KindMismatch {
        category: CategoryKind,
        requested: CategoryKind,
    },

    /// Amount out of range or too precise
    #[error("{0}")]
    InvalidAmount(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Input for a new transaction
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: Option<Uuid>,
    pub category_id: Uuid,
    /// Copied from the category when None
    pub kind: Option<CategoryKind>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
}

/// Partial update of a transaction
///
/// `account_id: Some(None)` detaches the account.
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    pub account_id: Option<Option<Uuid>>,
    pub category_id: Option<Uuid>,
    pub kind: Option<CategoryKind>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
}

/// Picks the type to store for a transaction in a category of `category`
pub fn resolve_kind(
    category: CategoryKind,
    requested: Option<CategoryKind>,
) -> Result<CategoryKind, LedgerError> {
    match requested {
        Some(requested) if requested != category => {
            Err(LedgerError::KindMismatch { category, requested })
        }
        _ => Ok(category),
    }
}

/// Checks an amount fits the ledger: positive, two decimals, NUMERIC(10,2)
pub fn check_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if amount.normalize().scale() > 2 {
        return Err(LedgerError::InvalidAmount(
            "Amount must have at most 2 decimal places".to_string(),
        ));
    }
    if amount > Decimal::new(MAX_AMOUNT_CENTS, 2) {
        return Err(LedgerError::InvalidAmount(
            "Amount must have at most 8 digits before the decimal point".to_string(),
        ));
    }
    Ok(())
}

async fn owned_category(
    pool: &PgPool,
    category_id: Uuid,
    user_id: Uuid,
) -> Result<Category, LedgerError> {
    Category::find_for_user(pool, category_id, user_id)
        .await?
        .ok_or(LedgerError::CategoryNotFound)
}

async fn ensure_account(pool: &PgPool, account_id: Uuid, user_id: Uuid) -> Result<(), LedgerError> {
    Account::find_for_user(pool, account_id, user_id)
        .await?
        .map(|_| ())
        .ok_or(LedgerError::AccountNotFound)
}

/// Validates and stores a new transaction for `user_id`
pub async fn record_transaction(
    pool: &PgPool,
    user_id: Uuid,
    input: NewTransaction,
) -> Result<Transaction, LedgerError> {
    check_amount(input.amount)?;

    let category = owned_category(pool, input.category_id, user_id).await?;
    let kind = resolve_kind(category.kind, input.kind)?;

    if let Some(account_id) = input.account_id {
        ensure_account(pool, account_id, user_id).await?;
    }

    let transaction = Transaction::insert(
        pool,
        InsertTransaction {
            user_id,
            account_id: input.account_id,
            category_id: category.id,
            kind,
            amount: input.amount,
            description: input.description.unwrap_or_default(),
            transaction_date: input.transaction_date,
        },
    )
    .await?;

    tracing::debug!(
        transaction_id = %transaction.id,
        user_id = %user_id,
        kind = %kind,
        "Recorded transaction"
    );

    Ok(transaction)
}

/// Applies a partial update to one of `user_id`'s transactions
pub async fn amend_transaction(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    changes: TransactionChanges,
) -> Result<Transaction, LedgerError> {
    let existing = Transaction::find_for_user(pool, id, user_id)
        .await?
        .ok_or(LedgerError::TransactionNotFound)?;

    if let Some(amount) = changes.amount {
        check_amount(amount)?;
    }

    // The type is re-derived whenever either side of the pair is touched.
    let kind = match (changes.category_id, changes.kind) {
        (None, None) => None,
        (category_id, requested) => {
            let category_id = category_id.unwrap_or(existing.category_id);
            let category = owned_category(pool, category_id, user_id).await?;
            Some(resolve_kind(category.kind, requested)?)
        }
    };

    if let Some(Some(account_id)) = changes.account_id {
        ensure_account(pool, account_id, user_id).await?;
    }

    Transaction::update_for_user(
        pool,
        id,
        user_id,
        UpdateTransaction {
            account_id: changes.account_id,
            category_id: changes.category_id,
            kind,
            amount: changes.amount,
            description: changes.description,
            transaction_date: changes.transaction_date,
        },
    )
    .await?
    .ok_or(LedgerError::TransactionNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_resolve_kind_copies_category_type() {
        assert_eq!(
            resolve_kind(CategoryKind::Expense, None).unwrap(),
            CategoryKind::Expense
        );
        assert_eq!(
            resolve_kind(CategoryKind::Income, Some(CategoryKind::Income)).unwrap(),
            CategoryKind::Income
        );
    }

    #[test]
    fn test_resolve_kind_rejects_mismatch() {
        let err = resolve_kind(CategoryKind::Expense, Some(CategoryKind::Income)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::KindMismatch {
                category: CategoryKind::Expense,
                requested: CategoryKind::Income
            }
        ));
        assert_eq!(
            err.to_string(),
            "Transaction type 'income' does not match category type 'expense'"
        );
    }

    #[test]
    fn test_check_amount() {
        assert!(check_amount(Decimal::from_str("50.00").unwrap()).is_ok());
        assert!(check_amount(Decimal::from_str("0.01").unwrap()).is_ok());
        assert!(check_amount(Decimal::from_str("99999999.99").unwrap()).is_ok());
        assert!(check_amount(Decimal::from_str("1.500").unwrap()).is_ok());

        assert!(check_amount(Decimal::ZERO).is_err());
        assert!(check_amount(Decimal::from_str("-5").unwrap()).is_err());
        assert!(check_amount(Decimal::from_str("1.005").unwrap()).is_err());
        assert!(check_amount(Decimal::from_str("100000000").unwrap()).is_err());
    }
}
