/// Account endpoints
///
/// - `GET /api/accounts/?currency=USD|CAD|CNY`
/// - `POST /api/accounts/`
/// - `GET/PUT/DELETE /api/accounts/<id>/`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::parse_optional,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use casho_shared::{
    auth::middleware::AuthContext,
    models::account::{Account, CreateAccount, Currency, UpdateAccount},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct AccountListParams {
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub currency: Currency,

    pub balance: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub currency: Option<Currency>,

    pub balance: Option<Decimal>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Account not found".to_string())
}

/// Balances are NUMERIC(14,2)
pub(crate) fn check_balance(balance: Option<Decimal>) -> ApiResult<()> {
    match balance {
        Some(b) if b.normalize().scale() > 2 => Err(ApiError::invalid_field(
            "balance",
            "Balance must have at most 2 decimal places",
        )),
        Some(b) if b.abs() >= Decimal::new(1_000_000_000_000, 0) => Err(ApiError::invalid_field(
            "balance",
            "Balance must have at most 12 digits before the decimal point",
        )),
        _ => Ok(()),
    }
}

pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<AccountListParams>,
) -> ApiResult<Json<Vec<Account>>> {
    let currency = parse_optional::<Currency>("currency", params.currency.as_deref())?;
    let accounts = Account::list_by_user(&state.db, auth.user_id, currency).await?;
    Ok(Json(accounts))
}

pub async fn create_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    req.validate()?;
    check_balance(req.balance)?;

    let account = Account::create(
        &state.db,
        CreateAccount {
            user_id: auth.user_id,
            name: req.name.trim().to_string(),
            currency: req.currency,
            balance: req.balance,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn get_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Account>> {
    Account::find_for_user(&state.db, id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<Account>> {
    req.validate()?;
    check_balance(req.balance)?;

    Account::update_for_user(
        &state.db,
        id,
        auth.user_id,
        UpdateAccount {
            name: req.name.map(|n| n.trim().to_string()),
            currency: req.currency,
            balance: req.balance,
        },
    )
    .await?
    .map(Json)
    .ok_or_else(not_found)
}

/// `DELETE /api/accounts/<id>/`
///
/// Transactions booked on the account are deleted with it.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if Account::delete_for_user(&state.db, id, auth.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_check_balance() {
        assert!(check_balance(None).is_ok());
        assert!(check_balance(Some(Decimal::from_str("-120.50").unwrap())).is_ok());
        assert!(check_balance(Some(Decimal::from_str("1.234").unwrap())).is_err());
        assert!(check_balance(Some(Decimal::from_str("1000000000000").unwrap())).is_err());
    }
}
