use consumption_store::{Metric, ReadingStore, Scope, StoreError};
use serde::Serialize;
use time::{Date, Duration, Month};

/// Rolling window for "current" averages.
pub const WINDOW_DAYS: i64 = 30;

/// Trailing window for the monthly trend, in calendar months.
pub const TREND_MONTHS: u32 = 12;

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn month_abbrev(month_num: i32) -> &'static str {
    MONTH_ABBREVS
        .get((month_num - 1).max(0) as usize)
        .copied()
        .unwrap_or("")
}

/// Steps back `months` calendar months from `date`, clamping the day to the
/// target month's length (e.g. May 31 minus 3 months is Feb 29 in 2024).
pub fn months_before(date: Date, months: u32) -> Date {
    let total = date.year() * 12 + i32::from(u8::from(date.month())) - 1 - months as i32;
    let year = total.div_euclid(12);
    let month = Month::try_from((total.rem_euclid(12) + 1) as u8)
        .expect("month index is always in 1..=12");
    let day = date.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).expect("clamped day is valid for its month")
}

/// 30-day average for a scope and metric as of `as_of`, rounded to two
/// decimals. `None` means no readings fell inside the window; callers decide
/// whether that reads as zero.
pub async fn current_average(
    store: &dyn ReadingStore,
    scope: Scope,
    metric: Metric,
    as_of: Date,
) -> Result<Option<f64>, StoreError> {
    let since = as_of - Duration::days(WINDOW_DAYS);
    let avg = store.average_usage(scope, metric, since).await?;
    Ok(avg.map(round2))
}

/// One point of the community trend series.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyUsage {
    pub month: &'static str,
    pub water: f64,
    pub electricity: f64,
}

/// Trailing 12-month trend for a community, grouped by calendar month and
/// ordered by month number ascending. The order does not wrap around the
/// year boundary; months keep their calendar positions.
pub async fn monthly_trend(
    store: &dyn ReadingStore,
    community_id: i64,
    as_of: Date,
) -> Result<Vec<MonthlyUsage>, StoreError> {
    let since = months_before(as_of, TREND_MONTHS);
    let rows = store.monthly_averages(community_id, since).await?;

    Ok(rows
        .into_iter()
        .map(|row| MonthlyUsage {
            month: month_abbrev(row.month_num),
            water: round1(row.water_usage.unwrap_or(0.0)),
            electricity: round1(row.electricity_usage.unwrap_or(0.0)),
        })
        .collect())
}
