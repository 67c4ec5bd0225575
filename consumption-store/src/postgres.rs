use sqlx::postgres::PgPool;
use time::Date;

use crate::domain::{Reading, Unit, UnitDetails};
use crate::error::StoreError;
use crate::store::{
    CommunitySummary, ExportRow, Metric, MonthlyAverage, ReadingStore, Scope, StoreCounts,
    UnitAverage,
};

/// Postgres-backed `ReadingStore`. Aggregation runs in SQL; the service layer
/// only applies rounding and presentation.
#[derive(Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReadingStore for PgReadingStore {
    async fn find_unit_by_number(&self, unit_number: &str) -> Result<Option<Unit>, StoreError> {
        let unit = sqlx::query_as::<_, Unit>(
            "SELECT id, community_id, unit_number FROM units WHERE unit_number = $1",
        )
        .bind(unit_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(unit)
    }

    async fn create_unit(
        &self,
        community_id: i64,
        unit_number: &str,
    ) -> Result<Unit, StoreError> {
        let unit = sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO units (community_id, unit_number)
            VALUES ($1, $2)
            RETURNING id, community_id, unit_number
            "#,
        )
        .bind(community_id)
        .bind(unit_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(unit)
    }

    async fn upsert_reading(
        &self,
        unit_id: i64,
        reading_date: Date,
        water_usage: f64,
        electricity_usage: f64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO consumption_readings (unit_id, reading_date, water_usage, electricity_usage)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (unit_id, reading_date)
            DO UPDATE SET
                water_usage = EXCLUDED.water_usage,
                electricity_usage = EXCLUDED.electricity_usage
            "#,
        )
        .bind(unit_id)
        .bind(reading_date)
        .bind(water_usage)
        .bind(electricity_usage)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unit_details(&self, unit_id: i64) -> Result<Option<UnitDetails>, StoreError> {
        let details = sqlx::query_as::<_, UnitDetails>(
            r#"
            SELECT
                u.id,
                u.community_id,
                u.unit_number,
                c.name AS community_name
            FROM units u
            JOIN communities c ON u.community_id = c.id
            WHERE u.id = $1
            "#,
        )
        .bind(unit_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    async fn list_readings(&self, unit_id: i64, limit: i64) -> Result<Vec<Reading>, StoreError> {
        let rows = sqlx::query_as::<_, Reading>(
            r#"
            SELECT unit_id, reading_date, water_usage, electricity_usage
            FROM consumption_readings
            WHERE unit_id = $1
            ORDER BY reading_date DESC
            LIMIT $2
            "#,
        )
        .bind(unit_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn average_usage(
        &self,
        scope: Scope,
        metric: Metric,
        since: Date,
    ) -> Result<Option<f64>, StoreError> {
        // Column names come from `Metric::column`, never from caller input.
        let avg = match scope {
            Scope::Unit(unit_id) => {
                let sql = format!(
                    r#"
                    SELECT AVG({col})
                    FROM consumption_readings
                    WHERE unit_id = $1
                      AND reading_date >= $2
                    "#,
                    col = metric.column(),
                );
                sqlx::query_scalar::<_, Option<f64>>(&sql)
                    .bind(unit_id)
                    .bind(since)
                    .fetch_one(&self.pool)
                    .await?
            }
            Scope::Community(community_id) => {
                let sql = format!(
                    r#"
                    SELECT AVG(cr.{col})
                    FROM consumption_readings cr
                    JOIN units u ON cr.unit_id = u.id
                    WHERE u.community_id = $1
                      AND cr.reading_date >= $2
                    "#,
                    col = metric.column(),
                );
                sqlx::query_scalar::<_, Option<f64>>(&sql)
                    .bind(community_id)
                    .bind(since)
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(avg)
    }

    async fn unit_water_averages(
        &self,
        community_id: i64,
        since: Date,
    ) -> Result<Vec<UnitAverage>, StoreError> {
        let rows = sqlx::query_as::<_, UnitAverage>(
            r#"
            SELECT
                u.id AS unit_id,
                u.unit_number,
                AVG(cr.water_usage) AS water_usage
            FROM units u
            JOIN consumption_readings cr ON u.id = cr.unit_id
            WHERE u.community_id = $1
              AND cr.reading_date >= $2
            GROUP BY u.id, u.unit_number
            ORDER BY u.unit_number
            "#,
        )
        .bind(community_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn monthly_averages(
        &self,
        community_id: i64,
        since: Date,
    ) -> Result<Vec<MonthlyAverage>, StoreError> {
        let rows = sqlx::query_as::<_, MonthlyAverage>(
            r#"
            SELECT
                CAST(EXTRACT(MONTH FROM cr.reading_date) AS INT) AS month_num,
                AVG(cr.water_usage) AS water_usage,
                AVG(cr.electricity_usage) AS electricity_usage
            FROM consumption_readings cr
            JOIN units u ON cr.unit_id = u.id
            WHERE u.community_id = $1
              AND cr.reading_date >= $2
            GROUP BY month_num
            ORDER BY month_num
            "#,
        )
        .bind(community_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn export_rows(&self, community_id: i64) -> Result<Vec<ExportRow>, StoreError> {
        let rows = sqlx::query_as::<_, ExportRow>(
            r#"
            SELECT
                u.unit_number,
                cr.reading_date,
                cr.water_usage,
                cr.electricity_usage,
                c.name AS community_name
            FROM consumption_readings cr
            JOIN units u ON cr.unit_id = u.id
            JOIN communities c ON u.community_id = c.id
            WHERE u.community_id = $1
            ORDER BY u.unit_number, cr.reading_date DESC
            "#,
        )
        .bind(community_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn community_summaries(
        &self,
        since: Date,
    ) -> Result<Vec<CommunitySummary>, StoreError> {
        let rows = sqlx::query_as::<_, CommunitySummary>(
            r#"
            SELECT
                c.id,
                c.name,
                COUNT(DISTINCT u.id) AS unit_count,
                AVG(cr.water_usage) AS avg_consumption
            FROM communities c
            JOIN units u ON c.id = u.community_id
            JOIN consumption_readings cr ON u.id = cr.unit_id
            WHERE cr.reading_date >= $1
            GROUP BY c.id, c.name
            ORDER BY c.name
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let communities = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM communities")
            .fetch_one(&self.pool)
            .await?;
        let units = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM units")
            .fetch_one(&self.pool)
            .await?;
        let readings = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM consumption_readings")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreCounts {
            communities,
            units,
            readings,
        })
    }
}
