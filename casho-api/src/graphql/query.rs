use super::{
    pool,
    types::{GqlAccount, GqlCategory, GqlCurrency, GqlKind, GqlStats, GqlTransaction, GqlUser},
    viewer, GqlResultExt,
};
use async_graphql::{Context, Object, Result};
use casho_shared::{
    models::{
        account::Account,
        category::Category,
        transaction::{Transaction, TransactionFilter},
        user::User,
    },
    stats::{self, StatsPeriod, StatsQuery},
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

pub struct QueryRoot;

async fn stats_for(ctx: &Context<'_>, query: StatsQuery) -> Result<Option<GqlStats>> {
    let Some(auth) = viewer(ctx) else {
        return Ok(None);
    };

    let range = query.resolve(Utc::now().date_naive()).gql()?;
    let result = stats::compute(pool(ctx)?, auth.user_id, query.label(), range)
        .await
        .gql()?;

    Ok(Some(result.into()))
}

#[Object]
impl QueryRoot {
    /// The caller's categories, optionally of one type
    async fn categories(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "type")] kind: Option<GqlKind>,
    ) -> Result<Vec<GqlCategory>> {
        let Some(auth) = viewer(ctx) else {
            return Ok(Vec::new());
        };

        let categories = Category::list_by_user(pool(ctx)?, auth.user_id, kind.map(Into::into))
            .await
            .gql()?;

        Ok(categories.into_iter().map(Into::into).collect())
    }

    /// The caller's transactions, newest first
    async fn transactions(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "type")] kind: Option<GqlKind>,
        category_id: Option<Uuid>,
        account_id: Option<Uuid>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        search: Option<String>,
    ) -> Result<Vec<GqlTransaction>> {
        let Some(auth) = viewer(ctx) else {
            return Ok(Vec::new());
        };

        let filter = TransactionFilter {
            kind: kind.map(Into::into),
            category_id,
            account_id,
            start_date,
            end_date,
            search: search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            ..Default::default()
        };

        let transactions = Transaction::list_for_user(pool(ctx)?, auth.user_id, &filter)
            .await
            .gql()?;

        Ok(transactions.into_iter().map(Into::into).collect())
    }

    /// Totals over a trailing period: week, month (default) or year
    async fn transaction_stats(
        &self,
        ctx: &Context<'_>,
        period: Option<String>,
    ) -> Result<Option<GqlStats>> {
        let query = StatsQuery::Period(StatsPeriod::parse_lenient(period.as_deref()));
        stats_for(ctx, query).await
    }

    /// Totals over an explicit date range, both ends inclusive
    async fn stats(
        &self,
        ctx: &Context<'_>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Option<GqlStats>> {
        let query = StatsQuery::Range {
            start: start_date,
            end: end_date,
        };
        stats_for(ctx, query).await
    }

    async fn accounts(
        &self,
        ctx: &Context<'_>,
        currency: Option<GqlCurrency>,
    ) -> Result<Vec<GqlAccount>> {
        let Some(auth) = viewer(ctx) else {
            return Ok(Vec::new());
        };

        let accounts = Account::list_by_user(pool(ctx)?, auth.user_id, currency.map(Into::into))
            .await
            .gql()?;

        Ok(accounts.into_iter().map(Into::into).collect())
    }

    /// The authenticated caller, or null
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<GqlUser>> {
        let Some(auth) = viewer(ctx) else {
            return Ok(None);
        };

        let user = User::find_by_id(pool(ctx)?, auth.user_id).await.gql()?;
        Ok(user.map(Into::into))
    }

    /// All users; empty for anonymous callers
    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<GqlUser>> {
        if viewer(ctx).is_none() {
            return Ok(Vec::new());
        }

        let users = User::list_all(pool(ctx)?).await.gql()?;
        Ok(users.into_iter().map(Into::into).collect())
    }
}
