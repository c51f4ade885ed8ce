/// Month-to-date report email for one user
///
/// Aggregates the first day of `today`'s month through `today` and mails
/// the totals to the user's address. A user that no longer exists is not a
/// failure: the job succeeds with a message saying so.

use super::{JobContext, JobError};
use crate::mail::EmailMessage;
use casho_shared::{
    models::user::User,
    stats::{self, DateRange, Stats},
};
use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

/// First day of the month through `today`
pub fn month_to_date(today: NaiveDate) -> DateRange {
    DateRange {
        start: today.with_day(1).unwrap_or(today),
        end: today,
    }
}

/// Builds the report email
pub fn render(from: &str, user: &User, stats: &Stats, today: NaiveDate) -> EmailMessage {
    let month = today.format("%B %Y");

    let body = format!(
        "Dear {username},\n\
         \n\
         Here is your financial report for {month}:\n\
         \n\
         Total income: {income}\n\
         Total expense: {expense}\n\
         Balance: {balance}\n\
         \n\
         Thank you for using Casho!\n",
        username = user.username,
        income = stats.income_total,
        expense = stats.expense_total,
        balance = stats.balance,
    );

    EmailMessage {
        from: from.to_string(),
        to: vec![user.email.clone()],
        subject: format!("Casho financial report for {month}"),
        body,
    }
}

pub async fn run(ctx: &JobContext, user_id: Uuid, today: NaiveDate) -> Result<String, JobError> {
    let Some(user) = User::find_by_id(&ctx.db, user_id).await? else {
        tracing::warn!(user_id = %user_id, "Monthly report for unknown user");
        return Ok(format!("User {user_id} does not exist"));
    };

    let stats = stats::compute(&ctx.db, user.id, "month", month_to_date(today)).await?;
    let message = render(&ctx.mail_from, &user, &stats, today);

    ctx.mailer.send(&message).await?;

    tracing::info!(user_id = %user.id, mailer = ctx.mailer.name(), "Monthly report sent");

    Ok(format!("Monthly report sent to {}", user.email))
}
