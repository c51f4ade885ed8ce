/// Income/expense aggregation
///
/// Two ways to pick the window:
///
/// - a named period: `week`, `month` or `year`, meaning the trailing 7, 30
///   or 365 days ending today (unknown names fall back to `month`)
/// - explicit `start_date`/`end_date`, a closed interval; a missing end is
///   today and a missing start is 30 days before the end
///
/// Sums are computed in SQL over NUMERIC and folded into a [`Stats`] value.
/// Every total is presented with two decimal places.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::category::CategoryKind;

/// Window length used when nothing else is specified
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Named trailing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Week,
    #[default]
    Month,
    Year,
}

impl StatsPeriod {
    /// Parses a period name; anything unrecognized is `Month`
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("week") => StatsPeriod::Week,
            Some("year") => StatsPeriod::Year,
            _ => StatsPeriod::Month,
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            StatsPeriod::Week => 7,
            StatsPeriod::Month => 30,
            StatsPeriod::Year => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Week => "week",
            StatsPeriod::Month => "month",
            StatsPeriod::Year => "year",
        }
    }
}

/// Closed date interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `days` days before `end` through `end`
    pub fn trailing(end: NaiveDate, days: i64) -> Result<Self, StatsError> {
        let start = days_before(end, days)?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Error for a window that cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("start_date ({start}) must not be after end_date ({end})")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("{days} days before {date} is outside the supported date range")]
    OutOfRange { date: NaiveDate, days: i64 },
}

fn days_before(date: NaiveDate, days: i64) -> Result<NaiveDate, StatsError> {
    date.checked_sub_signed(Duration::days(days))
        .ok_or(StatsError::OutOfRange { date, days })
}

/// How the caller chose the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsQuery {
    Period(StatsPeriod),
    Range {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl Default for StatsQuery {
    fn default() -> Self {
        StatsQuery::Period(StatsPeriod::Month)
    }
}

impl StatsQuery {
    /// Builds a query from raw request parameters
    ///
    /// Explicit dates win over a period name.
    pub fn from_params(
        period: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Self {
        if start.is_some() || end.is_some() {
            StatsQuery::Range { start, end }
        } else {
            StatsQuery::Period(StatsPeriod::parse_lenient(period))
        }
    }

    /// Label reported back to the caller
    pub fn label(&self) -> &'static str {
        match self {
            StatsQuery::Period(period) => period.as_str(),
            StatsQuery::Range { .. } => "custom",
        }
    }

    /// Resolves the concrete interval relative to `today`
    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange, StatsError> {
        match *self {
            StatsQuery::Period(period) => DateRange::trailing(today, period.days()),
            StatsQuery::Range { start, end } => {
                let end = end.unwrap_or(today);
                let start = match start {
                    Some(start) => start,
                    None => days_before(end, DEFAULT_WINDOW_DAYS)?,
                };
                if start > end {
                    return Err(StatsError::InvertedRange { start, end });
                }
                Ok(DateRange { start, end })
            }
        }
    }
}

/// One category's total inside the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub total: Decimal,
}

/// Aggregated figures for one user over one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub income_total: Decimal,
    pub expense_total: Decimal,
    /// income minus expense
    pub balance: Decimal,
    /// Category name to summed amount across both types
    pub category_stats: BTreeMap<String, Decimal>,
    /// Per (name, type) totals, largest first
    pub category_breakdown: Vec<CategoryTotal>,
}

/// Grouped sum as returned by the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategorySum {
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: CategoryKind,
    pub total: Decimal,
}

/// Two decimal places, always
pub fn money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

impl Stats {
    /// Folds grouped sums into totals
    pub fn from_sums(label: &str, range: DateRange, sums: Vec<CategorySum>) -> Self {
        let mut income = Decimal::ZERO;
        let mut expense = Decimal::ZERO;
        let mut category_stats: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut breakdown = Vec::with_capacity(sums.len());

        for sum in sums {
            match sum.kind {
                CategoryKind::Income => income += sum.total,
                CategoryKind::Expense => expense += sum.total,
            }
            *category_stats.entry(sum.name.clone()).or_insert(Decimal::ZERO) += sum.total;
            breakdown.push(CategoryTotal {
                name: sum.name,
                kind: sum.kind,
                total: money(sum.total),
            });
        }

        breakdown.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

        for total in category_stats.values_mut() {
            *total = money(*total);
        }

        Self {
            period: label.to_string(),
            start_date: range.start,
            end_date: range.end,
            income_total: money(income),
            expense_total: money(expense),
            balance: money(income - expense),
            category_stats,
            category_breakdown: breakdown,
        }
    }
}

/// Per-(category name, type) sums for a user's transactions inside `range`
pub async fn category_sums(
    pool: &PgPool,
    user_id: Uuid,
    range: DateRange,
) -> Result<Vec<CategorySum>, sqlx::Error> {
    sqlx::query_as::<_, CategorySum>(
        r#"
        SELECT c.name AS name, t.kind AS kind, SUM(t.amount) AS total
        FROM transactions t
        JOIN categories c ON c.id = t.category_id
        WHERE t.user_id = $1
          AND t.transaction_date BETWEEN $2 AND $3
        GROUP BY c.name, t.kind
        "#,
    )
    .bind(user_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_all(pool)
    .await
}

/// Computes a user's stats over an already resolved window
pub async fn compute(
    pool: &PgPool,
    user_id: Uuid,
    label: &str,
    range: DateRange,
) -> Result<Stats, sqlx::Error> {
    let sums = category_sums(pool, user_id, range).await?;
    Ok(Stats::from_sums(label, range, sums))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sum(name: &str, kind: CategoryKind, total: &str) -> CategorySum {
        CategorySum {
            name: name.to_string(),
            kind,
            total: dec(total),
        }
    }

    #[test]
    fn test_period_parsing_falls_back_to_month() {
        assert_eq!(StatsPeriod::parse_lenient(Some("week")), StatsPeriod::Week);
        assert_eq!(StatsPeriod::parse_lenient(Some("YEAR")), StatsPeriod::Year);
        assert_eq!(StatsPeriod::parse_lenient(Some("fortnight")), StatsPeriod::Month);
        assert_eq!(StatsPeriod::parse_lenient(None), StatsPeriod::Month);
    }

    #[test]
    fn test_period_windows() {
        let today = date(2024, 3, 31);

        let week = StatsQuery::Period(StatsPeriod::Week).resolve(today).unwrap();
        assert_eq!(week, DateRange { start: date(2024, 3, 24), end: today });

        let year = StatsQuery::Period(StatsPeriod::Year).resolve(today).unwrap();
        assert_eq!(year.start, date(2023, 4, 1));
    }

    #[test]
    fn test_explicit_range_defaults() {
        let today = date(2024, 3, 31);

        let only_start = StatsQuery::from_params(None, Some(date(2024, 1, 1)), None);
        assert_eq!(only_start.label(), "custom");
        assert_eq!(
            only_start.resolve(today).unwrap(),
            DateRange { start: date(2024, 1, 1), end: today }
        );

        let only_end = StatsQuery::from_params(Some("week"), None, Some(date(2024, 1, 31)));
        assert_eq!(
            only_end.resolve(today).unwrap(),
            DateRange { start: date(2024, 1, 1), end: date(2024, 1, 31) }
        );

        let none = StatsQuery::from_params(None, None, None);
        assert_eq!(none.label(), "month");
        assert_eq!(none.resolve(today).unwrap().start, date(2024, 3, 1));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let query = StatsQuery::from_params(None, Some(date(2024, 2, 1)), Some(date(2024, 1, 1)));
        assert!(matches!(
            query.resolve(date(2024, 3, 1)),
            Err(StatsError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_extreme_dates_do_not_overflow() {
        let today = date(2024, 1, 1);

        // explicit start: nothing to subtract
        let floor = NaiveDate::MIN;
        let range = StatsQuery::from_params(None, Some(floor), Some(floor))
            .resolve(today)
            .unwrap();
        assert_eq!(range, DateRange { start: floor, end: floor });

        let default_start = StatsQuery::from_params(None, None, Some(floor));
        assert!(matches!(
            default_start.resolve(today),
            Err(StatsError::OutOfRange { days: DEFAULT_WINDOW_DAYS, .. })
        ));

        assert!(DateRange::trailing(floor, 7).is_err());
        assert!(StatsQuery::Period(StatsPeriod::Year).resolve(floor).is_err());
    }

    #[test]
    fn test_single_day_range_is_allowed() {
        let day = date(2024, 1, 1);
        let range = StatsQuery::from_params(None, Some(day), Some(day))
            .resolve(day)
            .unwrap();
        assert!(range.contains(day));
        assert!(!range.contains(date(2024, 1, 2)));
    }

    #[test]
    fn test_fold_single_expense() {
        let range = DateRange { start: date(2024, 1, 1), end: date(2024, 1, 1) };
        let stats = Stats::from_sums("custom", range, vec![sum("Food", CategoryKind::Expense, "50")]);

        assert_eq!(stats.income_total.to_string(), "0.00");
        assert_eq!(stats.expense_total.to_string(), "50.00");
        assert_eq!(stats.balance.to_string(), "-50.00");
        assert_eq!(stats.category_stats.get("Food").map(|d| d.to_string()), Some("50.00".to_string()));
    }

    #[test]
    fn test_fold_empty_is_zero() {
        let range = DateRange { start: date(2024, 1, 1), end: date(2024, 1, 31) };
        let stats = Stats::from_sums("custom", range, Vec::new());

        assert_eq!(stats.income_total, Decimal::ZERO);
        assert_eq!(stats.expense_total, Decimal::ZERO);
        assert_eq!(stats.balance.to_string(), "0.00");
        assert!(stats.category_stats.is_empty());
        assert!(stats.category_breakdown.is_empty());
    }

    #[test]
    fn test_breakdown_order_and_name_merge() {
        let range = DateRange { start: date(2024, 1, 1), end: date(2024, 1, 31) };
        let stats = Stats::from_sums(
            "month",
            range,
            vec![
                sum("Bonus", CategoryKind::Income, "100.00"),
                sum("Other", CategoryKind::Expense, "20.50"),
                sum("Other", CategoryKind::Income, "20.50"),
                sum("Rent", CategoryKind::Expense, "900"),
            ],
        );

        let order: Vec<(&str, CategoryKind)> = stats
            .category_breakdown
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(order[0], ("Rent", CategoryKind::Expense));
        assert_eq!(order[1], ("Bonus", CategoryKind::Income));
        assert_eq!(order[2].0, "Other");
        assert_eq!(order[3].0, "Other");

        assert_eq!(stats.category_stats["Other"], dec("41.00"));
        assert_eq!(stats.income_total, dec("120.50"));
        assert_eq!(stats.expense_total, dec("920.50"));
        assert_eq!(stats.balance, dec("-800.00"));
    }

    #[test]
    fn test_totals_serialize_as_strings() {
        let range = DateRange { start: date(2024, 1, 1), end: date(2024, 1, 1) };
        let stats = Stats::from_sums("custom", range, vec![sum("Food", CategoryKind::Expense, "50")]);
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["expense_total"], "50.00");
        assert_eq!(json["category_stats"]["Food"], "50.00");
        assert_eq!(json["category_breakdown"][0]["type"], "expense");
        assert_eq!(json["start_date"], "2024-01-01");
    }
}
