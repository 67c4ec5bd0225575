use consumption_store::{Metric, ReadingStore, Scope, StoreError};
use serde::Serialize;
use time::Date;

use super::aggregate;

/// Absolute-difference threshold (gallons or kWh, not a percentage) above
/// which conservation tips are added.
const TIP_THRESHOLD: f64 = 20.0;

/// Readings returned in the historical series.
const HISTORY_LIMIT: i64 = 12;

const WATER_TIPS: [&str; 2] = [
    "Consider installing low-flow fixtures to reduce water usage",
    "Check for leaks in faucets and toilets",
];

const ELECTRICITY_TIPS: [&str; 2] = [
    "Switch to LED bulbs to reduce electricity consumption",
    "Unplug electronics when not in use",
];

const BELOW_AVERAGE_TIP: &str = "Great job! Your usage is below community average";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub id: i64,
    pub unit_number: String,
    pub community_name: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UsagePair {
    pub water: f64,
    pub electricity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalPoint {
    pub date: Date,
    pub water: f64,
    pub electricity: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReport {
    pub unit: UnitSummary,
    pub current_usage: UsagePair,
    pub community_average: UsagePair,
    pub historical_data: Vec<HistoricalPoint>,
    pub tips: Vec<&'static str>,
}

/// Derives tips from absolute usage differences. All applicable tips are
/// appended; the thresholds are in each metric's own unit and are not
/// normalized between water and electricity.
pub fn efficiency_tips(water_diff: f64, electricity_diff: f64) -> Vec<&'static str> {
    let mut tips = Vec::new();

    if water_diff > TIP_THRESHOLD {
        tips.extend(WATER_TIPS);
    }
    if electricity_diff > TIP_THRESHOLD {
        tips.extend(ELECTRICITY_TIPS);
    }
    if water_diff <= 0.0 && electricity_diff <= 0.0 {
        tips.push(BELOW_AVERAGE_TIP);
    }

    tips
}

/// Builds the full report for one unit: identity, 30-day unit and community
/// averages, a newest-first history capped at 12 readings, and derived tips.
/// Returns `None` when the unit does not exist; missing usage data reads as
/// zero, matching the benchmark surface.
pub async fn unit_report(
    store: &dyn ReadingStore,
    unit_id: i64,
    as_of: Date,
) -> Result<Option<UnitReport>, StoreError> {
    let Some(details) = store.unit_details(unit_id).await? else {
        return Ok(None);
    };

    let history = store.list_readings(unit_id, HISTORY_LIMIT).await?;

    let water =
        aggregate::current_average(store, Scope::Unit(unit_id), Metric::Water, as_of)
            .await?
            .unwrap_or(0.0);
    let electricity =
        aggregate::current_average(store, Scope::Unit(unit_id), Metric::Electricity, as_of)
            .await?
            .unwrap_or(0.0);

    let community_scope = Scope::Community(details.community_id);
    let community_water = aggregate::current_average(store, community_scope, Metric::Water, as_of)
        .await?
        .unwrap_or(0.0);
    let community_electricity =
        aggregate::current_average(store, community_scope, Metric::Electricity, as_of)
            .await?
            .unwrap_or(0.0);

    let tips = efficiency_tips(water - community_water, electricity - community_electricity);

    Ok(Some(UnitReport {
        unit: UnitSummary {
            id: details.id,
            unit_number: details.unit_number,
            community_name: details.community_name,
        },
        current_usage: UsagePair { water, electricity },
        community_average: UsagePair {
            water: community_water,
            electricity: community_electricity,
        },
        historical_data: history
            .into_iter()
            .map(|r| HistoricalPoint {
                date: r.reading_date,
                water: r.water_usage,
                electricity: r.electricity_usage,
            })
            .collect(),
        tips,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use consumption_store::MemoryStore;
    use time::macros::date;

    #[test]
    fn high_water_alone_yields_exactly_the_water_tips() {
        let tips = efficiency_tips(25.0, 0.0);
        assert_eq!(tips, WATER_TIPS.to_vec());
    }

    #[test]
    fn high_electricity_alone_yields_exactly_the_electricity_tips() {
        let tips = efficiency_tips(0.0, 30.0);
        assert_eq!(tips, ELECTRICITY_TIPS.to_vec());
    }

    #[test]
    fn both_high_appends_both_tip_sets_in_order() {
        let tips = efficiency_tips(21.0, 21.0);
        assert_eq!(tips.len(), 4);
        assert_eq!(&tips[..2], &WATER_TIPS);
        assert_eq!(&tips[2..], &ELECTRICITY_TIPS);
    }

    #[test]
    fn below_average_on_both_metrics_earns_the_positive_tip() {
        let tips = efficiency_tips(-5.0, 0.0);
        assert_eq!(tips, vec![BELOW_AVERAGE_TIP]);
    }

    #[test]
    fn moderately_high_usage_earns_no_tips() {
        // Above average on water but under the absolute threshold, and the
        // positive tip requires both diffs at or below zero.
        let tips = efficiency_tips(10.0, -5.0);
        assert!(tips.is_empty());
        assert!(efficiency_tips(20.0, 20.0).is_empty());
    }

    #[tokio::test]
    async fn missing_unit_yields_none() {
        let store = MemoryStore::new();
        let report = unit_report(&store, 7, date!(2024 - 06 - 30)).await.unwrap();
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn report_combines_averages_history_and_tips() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let unit = store.create_unit(community, "A1").await.unwrap();
        let neighbor = store.create_unit(community, "B2").await.unwrap();

        store
            .upsert_reading(unit.id, date!(2024 - 06 - 10), 150.0, 10.0)
            .await
            .unwrap();
        store
            .upsert_reading(unit.id, date!(2024 - 06 - 20), 150.0, 10.0)
            .await
            .unwrap();
        store
            .upsert_reading(neighbor.id, date!(2024 - 06 - 15), 50.0, 10.0)
            .await
            .unwrap();

        let report = unit_report(&store, unit.id, date!(2024 - 06 - 30))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.unit.unit_number, "A1");
        assert_eq!(report.unit.community_name, "Oakwood");
        assert_eq!(report.current_usage.water, 150.0);
        assert_eq!(report.community_average.water, 116.67);
        assert_eq!(report.community_average.electricity, 10.0);

        assert_eq!(report.historical_data.len(), 2);
        assert_eq!(report.historical_data[0].date, date!(2024 - 06 - 20));

        // water_diff = 33.33, electricity_diff = 0.
        assert_eq!(report.tips, WATER_TIPS.to_vec());
    }

    #[tokio::test]
    async fn unit_without_readings_reports_zeros_and_the_positive_tip() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let unit = store.create_unit(community, "A1").await.unwrap();

        let report = unit_report(&store, unit.id, date!(2024 - 06 - 30))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.current_usage.water, 0.0);
        assert_eq!(report.community_average.water, 0.0);
        assert!(report.historical_data.is_empty());
        assert_eq!(report.tips, vec![BELOW_AVERAGE_TIP]);
    }

    #[tokio::test]
    async fn history_is_capped_at_twelve_newest_first() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let unit = store.create_unit(community, "A1").await.unwrap();

        for day in 1u8..=15 {
            let reading_date = date!(2024 - 06 - 01).replace_day(day).unwrap();
            store
                .upsert_reading(unit.id, reading_date, f64::from(day), 0.0)
                .await
                .unwrap();
        }

        let report = unit_report(&store, unit.id, date!(2024 - 06 - 30))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.historical_data.len(), 12);
        assert_eq!(report.historical_data[0].date, date!(2024 - 06 - 15));
        assert_eq!(report.historical_data[11].date, date!(2024 - 06 - 04));
    }
}
