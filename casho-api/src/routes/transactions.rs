/// Transaction endpoints
///
/// - `GET /api/transactions/` with filters `type`, `category`, `account`,
///   `date`, `start_date`, `end_date`, `search` and `ordering`
///   (`amount`, `date`, `created_at`, optionally prefixed with `-`)
/// - `POST /api/transactions/`
/// - `GET/PUT/DELETE /api/transactions/<id>/`
/// - `GET /api/transactions/stats/?period=week|month|year`
///   or `?start_date=&end_date=`
///
/// Writes go through the ledger rules, so the stored type always agrees
/// with the category.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{auth::double_option, parse_optional},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use casho_shared::{
    auth::middleware::AuthContext,
    ledger::{self, NewTransaction, TransactionChanges},
    models::{
        category::CategoryKind,
        transaction::{Transaction, TransactionFilter, TransactionOrdering},
    },
    stats::{self, Stats, StatsQuery},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct TransactionListParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub account: Option<String>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl TransactionListParams {
    fn into_filter(self) -> ApiResult<TransactionFilter> {
        Ok(TransactionFilter {
            kind: parse_optional::<CategoryKind>("type", self.kind.as_deref())?,
            category_id: parse_optional::<Uuid>("category", self.category.as_deref())?,
            account_id: parse_optional::<Uuid>("account", self.account.as_deref())?,
            date: parse_optional::<NaiveDate>("date", self.date.as_deref())?,
            start_date: parse_optional::<NaiveDate>("start_date", self.start_date.as_deref())?,
            end_date: parse_optional::<NaiveDate>("end_date", self.end_date.as_deref())?,
            search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            ordering: parse_optional::<TransactionOrdering>("ordering", self.ordering.as_deref())?
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransactionRequest {
    pub category: Uuid,

    pub account: Option<Uuid>,

    /// Copied from the category when absent
    #[serde(rename = "type")]
    pub kind: Option<CategoryKind>,

    pub amount: Decimal,

    #[validate(length(max = 200, message = "Description must be at most 200 characters"))]
    pub description: Option<String>,

    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTransactionRequest {
    pub category: Option<Uuid>,

    /// `null` detaches the account
    #[serde(default, deserialize_with = "double_option")]
    pub account: Option<Option<Uuid>>,

    #[serde(rename = "type")]
    pub kind: Option<CategoryKind>,

    pub amount: Option<Decimal>,

    #[validate(length(max = 200, message = "Description must be at most 200 characters"))]
    pub description: Option<String>,

    pub date: Option<NaiveDate>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Transaction not found".to_string())
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<TransactionListParams>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let filter = params.into_filter()?;
    let transactions = Transaction::list_for_user(&state.db, auth.user_id, &filter).await?;
    Ok(Json(transactions))
}

/// `POST /api/transactions/`
///
/// ```text
/// {"category": "<uuid>", "amount": "50.00", "date": "2024-01-01",
///  "description": "Groceries"}
/// ```
///
/// # Errors
///
/// - `422`: foreign/unknown category or account, type mismatch, bad amount
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTransactionRequest>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    req.validate()?;

    let transaction = ledger::record_transaction(
        &state.db,
        auth.user_id,
        NewTransaction {
            account_id: req.account,
            category_id: req.category,
            kind: req.kind,
            amount: req.amount,
            description: req.description,
            transaction_date: req.date,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Transaction>> {
    Transaction::find_for_user(&state.db, id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn update_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTransactionRequest>,
) -> ApiResult<Json<Transaction>> {
    req.validate()?;

    let transaction = ledger::amend_transaction(
        &state.db,
        auth.user_id,
        id,
        TransactionChanges {
            account_id: req.account,
            category_id: req.category,
            kind: req.kind,
            amount: req.amount,
            description: req.description,
            transaction_date: req.date,
        },
    )
    .await?;

    Ok(Json(transaction))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if Transaction::delete_for_user(&state.db, id, auth.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

/// `GET /api/transactions/stats/`
///
/// ```json
/// {
///   "period": "month",
///   "start_date": "2024-01-01",
///   "end_date": "2024-01-31",
///   "income_total": "0.00",
///   "expense_total": "50.00",
///   "balance": "-50.00",
///   "category_stats": {"Food": "50.00"},
///   "category_breakdown": [{"name": "Food", "type": "expense", "total": "50.00"}]
/// }
/// ```
pub async fn transaction_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<StatsParams>,
) -> ApiResult<Json<Stats>> {
    let query = StatsQuery::from_params(
        params.period.as_deref(),
        parse_optional::<NaiveDate>("start_date", params.start_date.as_deref())?,
        parse_optional::<NaiveDate>("end_date", params.end_date.as_deref())?,
    );
    let range = query.resolve(Utc::now().date_naive())?;

    let result = stats::compute(&state.db, auth.user_id, query.label(), range).await?;
    Ok(Json(result))
}
