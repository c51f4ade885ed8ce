/// Last-7-days totals for every user
///
/// The summary is the job result; nothing is mailed.

use super::JobError;
use casho_shared::{
    models::user::User,
    stats::{self, DateRange},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: Uuid,
    pub username: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

pub async fn run(pool: &PgPool, today: NaiveDate) -> Result<Vec<UserSummary>, JobError> {
    let range = DateRange::trailing(today, WINDOW_DAYS)?;
    let users = User::list_all(pool).await?;

    let mut summary = Vec::with_capacity(users.len());
    for user in users {
        let totals = stats::compute(pool, user.id, "week", range).await?;
        summary.push(UserSummary {
            user_id: user.id,
            username: user.username,
            income: totals.income_total,
            expense: totals.expense_total,
            balance: totals.balance,
        });
    }

    tracing::info!(users = summary.len(), start = %range.start, end = %range.end, "Weekly summary built");

    Ok(summary)
}
