use time::Date;

use crate::domain::{Reading, Unit, UnitDetails};
use crate::error::StoreError;

/// Which consumption metric an aggregate query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Water,
    Electricity,
}

impl Metric {
    /// Column name in `consumption_readings`.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Water => "water_usage",
            Metric::Electricity => "electricity_usage",
        }
    }
}

/// Scope of an aggregate query: one unit, or every unit of a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Unit(i64),
    Community(i64),
}

/// Per-unit water average over a window, one row per unit that has readings
/// in the window.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitAverage {
    pub unit_id: i64,
    pub unit_number: String,
    pub water_usage: f64,
}

/// Per-calendar-month averages for a community, `month_num` in 1..=12.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonthlyAverage {
    pub month_num: i32,
    pub water_usage: Option<f64>,
    pub electricity_usage: Option<f64>,
}

/// One export line: a reading joined with its unit and community.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExportRow {
    pub unit_number: String,
    pub reading_date: Date,
    pub water_usage: f64,
    pub electricity_usage: f64,
    pub community_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommunitySummary {
    pub id: i64,
    pub name: String,
    pub unit_count: i64,
    pub avg_consumption: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct StoreCounts {
    pub communities: i64,
    pub units: i64,
    pub readings: i64,
}

/// Persistence boundary for readings, units, and communities.
///
/// All aggregate queries filter on `reading_date >= since`; `None` from
/// `average_usage` means no readings matched, which callers may coerce to
/// zero but the adapter never does.
#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    async fn find_unit_by_number(&self, unit_number: &str) -> Result<Option<Unit>, StoreError>;

    async fn create_unit(
        &self,
        community_id: i64,
        unit_number: &str,
    ) -> Result<Unit, StoreError>;

    /// Insert or overwrite the reading for `(unit_id, reading_date)`.
    /// Last write wins; there is no merge and no audit trail.
    async fn upsert_reading(
        &self,
        unit_id: i64,
        reading_date: Date,
        water_usage: f64,
        electricity_usage: f64,
    ) -> Result<(), StoreError>;

    async fn unit_details(&self, unit_id: i64) -> Result<Option<UnitDetails>, StoreError>;

    /// Readings for one unit, newest first, at most `limit` rows.
    async fn list_readings(&self, unit_id: i64, limit: i64) -> Result<Vec<Reading>, StoreError>;

    async fn average_usage(
        &self,
        scope: Scope,
        metric: Metric,
        since: Date,
    ) -> Result<Option<f64>, StoreError>;

    /// Water averages per unit of a community over the window, ordered by
    /// unit number. Units with no readings in the window are omitted.
    async fn unit_water_averages(
        &self,
        community_id: i64,
        since: Date,
    ) -> Result<Vec<UnitAverage>, StoreError>;

    /// Calendar-month averages for a community, ordered by month number.
    async fn monthly_averages(
        &self,
        community_id: i64,
        since: Date,
    ) -> Result<Vec<MonthlyAverage>, StoreError>;

    /// Every reading of a community joined with unit and community names,
    /// ordered by unit number, then date descending.
    async fn export_rows(&self, community_id: i64) -> Result<Vec<ExportRow>, StoreError>;

    async fn community_summaries(&self, since: Date)
        -> Result<Vec<CommunitySummary>, StoreError>;

    async fn counts(&self) -> Result<StoreCounts, StoreError>;
}
