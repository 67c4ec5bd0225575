use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use time::Date;

use crate::domain::{Reading, Unit, UnitDetails};
use crate::error::StoreError;
use crate::store::{
    CommunitySummary, ExportRow, Metric, MonthlyAverage, ReadingStore, Scope, StoreCounts,
    UnitAverage,
};

/// In-memory `ReadingStore` for tests and local experiments.
///
/// Mirrors the SQL adapter's visibility rules: grouped queries omit units
/// without readings in the window, and joins drop units whose community row
/// is missing.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    communities: BTreeMap<i64, String>,
    units: BTreeMap<i64, Unit>,
    readings: HashMap<(i64, Date), (f64, f64)>,
    next_community_id: i64,
    next_unit_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a community and return its id. Communities are created
    /// externally in the real system, so this sits outside the trait.
    pub fn insert_community(&self, name: &str) -> i64 {
        let mut inner = self.lock();
        inner.next_community_id += 1;
        let id = inner.next_community_id;
        inner.communities.insert(id, name.to_string());
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

impl Inner {
    fn community_unit_ids(&self, community_id: i64) -> Vec<i64> {
        self.units
            .values()
            .filter(|u| u.community_id == community_id)
            .map(|u| u.id)
            .collect()
    }

    fn readings_since(&self, unit_ids: &[i64], since: Date) -> Vec<(Date, f64, f64)> {
        self.readings
            .iter()
            .filter(|((unit_id, date), _)| unit_ids.contains(unit_id) && *date >= since)
            .map(|((_, date), (water, electricity))| (*date, *water, *electricity))
            .collect()
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[async_trait::async_trait]
impl ReadingStore for MemoryStore {
    async fn find_unit_by_number(&self, unit_number: &str) -> Result<Option<Unit>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .units
            .values()
            .find(|u| u.unit_number == unit_number)
            .cloned())
    }

    async fn create_unit(
        &self,
        community_id: i64,
        unit_number: &str,
    ) -> Result<Unit, StoreError> {
        let mut inner = self.lock();
        inner.next_unit_id += 1;
        let unit = Unit {
            id: inner.next_unit_id,
            community_id,
            unit_number: unit_number.to_string(),
        };
        inner.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn upsert_reading(
        &self,
        unit_id: i64,
        reading_date: Date,
        water_usage: f64,
        electricity_usage: f64,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .readings
            .insert((unit_id, reading_date), (water_usage, electricity_usage));
        Ok(())
    }

    async fn unit_details(&self, unit_id: i64) -> Result<Option<UnitDetails>, StoreError> {
        let inner = self.lock();
        let Some(unit) = inner.units.get(&unit_id) else {
            return Ok(None);
        };
        let Some(community_name) = inner.communities.get(&unit.community_id) else {
            return Ok(None);
        };
        Ok(Some(UnitDetails {
            id: unit.id,
            community_id: unit.community_id,
            unit_number: unit.unit_number.clone(),
            community_name: community_name.clone(),
        }))
    }

    async fn list_readings(&self, unit_id: i64, limit: i64) -> Result<Vec<Reading>, StoreError> {
        let inner = self.lock();
        let mut rows: Vec<Reading> = inner
            .readings
            .iter()
            .filter(|((id, _), _)| *id == unit_id)
            .map(|((_, date), (water, electricity))| Reading {
                unit_id,
                reading_date: *date,
                water_usage: *water,
                electricity_usage: *electricity,
            })
            .collect();
        rows.sort_by(|a, b| b.reading_date.cmp(&a.reading_date));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn average_usage(
        &self,
        scope: Scope,
        metric: Metric,
        since: Date,
    ) -> Result<Option<f64>, StoreError> {
        let inner = self.lock();
        let unit_ids = match scope {
            Scope::Unit(unit_id) => vec![unit_id],
            Scope::Community(community_id) => inner.community_unit_ids(community_id),
        };
        let values: Vec<f64> = inner
            .readings_since(&unit_ids, since)
            .into_iter()
            .map(|(_, water, electricity)| match metric {
                Metric::Water => water,
                Metric::Electricity => electricity,
            })
            .collect();
        Ok(mean(&values))
    }

    async fn unit_water_averages(
        &self,
        community_id: i64,
        since: Date,
    ) -> Result<Vec<UnitAverage>, StoreError> {
        let inner = self.lock();
        let mut units: Vec<&Unit> = inner
            .units
            .values()
            .filter(|u| u.community_id == community_id)
            .collect();
        units.sort_by(|a, b| a.unit_number.cmp(&b.unit_number));

        let mut rows = Vec::new();
        for unit in units {
            let values: Vec<f64> = inner
                .readings_since(&[unit.id], since)
                .into_iter()
                .map(|(_, water, _)| water)
                .collect();
            if let Some(avg) = mean(&values) {
                rows.push(UnitAverage {
                    unit_id: unit.id,
                    unit_number: unit.unit_number.clone(),
                    water_usage: avg,
                });
            }
        }
        Ok(rows)
    }

    async fn monthly_averages(
        &self,
        community_id: i64,
        since: Date,
    ) -> Result<Vec<MonthlyAverage>, StoreError> {
        let inner = self.lock();
        let unit_ids = inner.community_unit_ids(community_id);

        let mut by_month: BTreeMap<u8, Vec<(f64, f64)>> = BTreeMap::new();
        for (date, water, electricity) in inner.readings_since(&unit_ids, since) {
            by_month
                .entry(u8::from(date.month()))
                .or_default()
                .push((water, electricity));
        }

        Ok(by_month
            .into_iter()
            .map(|(month_num, values)| {
                let water: Vec<f64> = values.iter().map(|(w, _)| *w).collect();
                let electricity: Vec<f64> = values.iter().map(|(_, e)| *e).collect();
                MonthlyAverage {
                    month_num: i32::from(month_num),
                    water_usage: mean(&water),
                    electricity_usage: mean(&electricity),
                }
            })
            .collect())
    }

    async fn export_rows(&self, community_id: i64) -> Result<Vec<ExportRow>, StoreError> {
        let inner = self.lock();
        let Some(community_name) = inner.communities.get(&community_id) else {
            return Ok(Vec::new());
        };

        let mut units: Vec<&Unit> = inner
            .units
            .values()
            .filter(|u| u.community_id == community_id)
            .collect();
        units.sort_by(|a, b| a.unit_number.cmp(&b.unit_number));

        let mut rows = Vec::new();
        for unit in units {
            let mut readings = inner.readings_since(&[unit.id], Date::MIN);
            readings.sort_by(|a, b| b.0.cmp(&a.0));
            for (date, water, electricity) in readings {
                rows.push(ExportRow {
                    unit_number: unit.unit_number.clone(),
                    reading_date: date,
                    water_usage: water,
                    electricity_usage: electricity,
                    community_name: community_name.clone(),
                });
            }
        }
        Ok(rows)
    }

    async fn community_summaries(
        &self,
        since: Date,
    ) -> Result<Vec<CommunitySummary>, StoreError> {
        let inner = self.lock();
        let mut communities: Vec<(i64, String)> = inner
            .communities
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        communities.sort_by(|a, b| a.1.cmp(&b.1));

        let mut rows = Vec::new();
        for (id, name) in communities {
            let unit_ids = inner.community_unit_ids(id);
            let mut active_units = 0i64;
            let mut values = Vec::new();
            for unit_id in &unit_ids {
                let readings = inner.readings_since(&[*unit_id], since);
                if !readings.is_empty() {
                    active_units += 1;
                    values.extend(readings.into_iter().map(|(_, water, _)| water));
                }
            }
            if let Some(avg) = mean(&values) {
                rows.push(CommunitySummary {
                    id,
                    name,
                    unit_count: active_units,
                    avg_consumption: Some(avg),
                });
            }
        }
        Ok(rows)
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let inner = self.lock();
        Ok(StoreCounts {
            communities: inner.communities.len() as i64,
            units: inner.units.len() as i64,
            readings: inner.readings.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[tokio::test]
    async fn upsert_overwrites_existing_reading() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let unit = store.create_unit(community, "A1").await.unwrap();

        store
            .upsert_reading(unit.id, date!(2024 - 01 - 01), 100.0, 10.0)
            .await
            .unwrap();
        store
            .upsert_reading(unit.id, date!(2024 - 01 - 01), 150.0, 12.0)
            .await
            .unwrap();

        let readings = store.list_readings(unit.id, 12).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].water_usage, 150.0);
        assert_eq!(readings[0].electricity_usage, 12.0);
    }

    #[tokio::test]
    async fn list_readings_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let unit = store.create_unit(community, "A1").await.unwrap();

        for day in 1u8..=5 {
            let reading_date = date!(2024 - 03 - 01).replace_day(day).unwrap();
            store
                .upsert_reading(unit.id, reading_date, f64::from(day), 0.0)
                .await
                .unwrap();
        }

        let readings = store.list_readings(unit.id, 3).await.unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].reading_date, date!(2024 - 03 - 05));
        assert_eq!(readings[2].reading_date, date!(2024 - 03 - 03));
    }

    #[tokio::test]
    async fn average_usage_is_none_without_readings_in_window() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let unit = store.create_unit(community, "A1").await.unwrap();

        store
            .upsert_reading(unit.id, date!(2024 - 01 - 01), 100.0, 10.0)
            .await
            .unwrap();

        let avg = store
            .average_usage(Scope::Unit(unit.id), Metric::Water, date!(2024 - 02 - 01))
            .await
            .unwrap();
        assert_eq!(avg, None);

        let avg = store
            .average_usage(Scope::Unit(unit.id), Metric::Water, date!(2024 - 01 - 01))
            .await
            .unwrap();
        assert_eq!(avg, Some(100.0));
    }

    #[tokio::test]
    async fn community_average_spans_all_units() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let a = store.create_unit(community, "A1").await.unwrap();
        let b = store.create_unit(community, "B2").await.unwrap();

        store
            .upsert_reading(a.id, date!(2024 - 06 - 01), 100.0, 10.0)
            .await
            .unwrap();
        store
            .upsert_reading(b.id, date!(2024 - 06 - 02), 200.0, 30.0)
            .await
            .unwrap();

        let water = store
            .average_usage(
                Scope::Community(community),
                Metric::Water,
                date!(2024 - 06 - 01),
            )
            .await
            .unwrap();
        assert_eq!(water, Some(150.0));

        let electricity = store
            .average_usage(
                Scope::Community(community),
                Metric::Electricity,
                date!(2024 - 06 - 01),
            )
            .await
            .unwrap();
        assert_eq!(electricity, Some(20.0));
    }

    #[tokio::test]
    async fn unit_water_averages_omit_units_without_window_readings() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let a = store.create_unit(community, "A1").await.unwrap();
        let stale = store.create_unit(community, "B2").await.unwrap();

        store
            .upsert_reading(a.id, date!(2024 - 06 - 10), 120.0, 0.0)
            .await
            .unwrap();
        store
            .upsert_reading(stale.id, date!(2023 - 01 - 01), 500.0, 0.0)
            .await
            .unwrap();

        let rows = store
            .unit_water_averages(community, date!(2024 - 06 - 01))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].unit_number, "A1");
        assert_eq!(rows[0].water_usage, 120.0);
    }

    #[tokio::test]
    async fn monthly_averages_group_by_calendar_month_in_order() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let unit = store.create_unit(community, "A1").await.unwrap();

        store
            .upsert_reading(unit.id, date!(2024 - 01 - 05), 100.0, 10.0)
            .await
            .unwrap();
        store
            .upsert_reading(unit.id, date!(2024 - 01 - 20), 200.0, 20.0)
            .await
            .unwrap();
        store
            .upsert_reading(unit.id, date!(2024 - 03 - 05), 300.0, 30.0)
            .await
            .unwrap();

        let rows = store
            .monthly_averages(community, date!(2024 - 01 - 01))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month_num, 1);
        assert_eq!(rows[0].water_usage, Some(150.0));
        assert_eq!(rows[1].month_num, 3);
        assert_eq!(rows[1].electricity_usage, Some(30.0));
    }

    #[tokio::test]
    async fn export_rows_order_and_join_semantics() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let b = store.create_unit(community, "B2").await.unwrap();
        let a = store.create_unit(community, "A1").await.unwrap();
        // Unit under an unregistered community never joins.
        let orphan = store.create_unit(999, "Z9").await.unwrap();

        store
            .upsert_reading(a.id, date!(2024 - 01 - 01), 100.0, 10.0)
            .await
            .unwrap();
        store
            .upsert_reading(a.id, date!(2024 - 01 - 02), 110.0, 11.0)
            .await
            .unwrap();
        store
            .upsert_reading(b.id, date!(2024 - 01 - 01), 200.0, 20.0)
            .await
            .unwrap();
        store
            .upsert_reading(orphan.id, date!(2024 - 01 - 01), 999.0, 99.0)
            .await
            .unwrap();

        let rows = store.export_rows(community).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].unit_number, "A1");
        assert_eq!(rows[0].reading_date, date!(2024 - 01 - 02));
        assert_eq!(rows[1].reading_date, date!(2024 - 01 - 01));
        assert_eq!(rows[2].unit_number, "B2");
        assert!(rows.iter().all(|r| r.community_name == "Oakwood"));

        let empty = store.export_rows(12345).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn community_summaries_skip_communities_without_recent_readings() {
        let store = MemoryStore::new();
        let active = store.insert_community("Active");
        let idle = store.insert_community("Idle");
        let a = store.create_unit(active, "A1").await.unwrap();
        store.create_unit(idle, "I1").await.unwrap();

        store
            .upsert_reading(a.id, date!(2024 - 06 - 15), 80.0, 8.0)
            .await
            .unwrap();

        let rows = store.community_summaries(date!(2024 - 06 - 01)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Active");
        assert_eq!(rows[0].unit_count, 1);
        assert_eq!(rows[0].avg_consumption, Some(80.0));
    }
}
