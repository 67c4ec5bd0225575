use time::Date;

/// One consumption fact per unit per day. The store enforces at most one row
/// per `(unit_id, reading_date)`; re-imports overwrite in place.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Reading {
    pub unit_id: i64,
    pub reading_date: Date,
    pub water_usage: f64,
    pub electricity_usage: f64,
}
