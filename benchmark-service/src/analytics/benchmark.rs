use consumption_store::{Metric, ReadingStore, Scope, StoreError};
use serde::Serialize;
use time::{Date, Duration};

use super::aggregate::{self, round1, round2, WINDOW_DAYS};

pub const GOOD_MESSAGE: &str = "Great job! Below average usage.";
pub const NORMAL_MESSAGE: &str = "Usage within normal range.";
pub const WARNING_MESSAGE: &str = "Usage above average. Consider conservation.";
pub const DANGER_MESSAGE: &str = "High usage detected. Immediate action recommended.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Good,
    Normal,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub diff_percent: f64,
    pub status: Status,
    pub message: &'static str,
}

/// Classifies a unit's usage against a reference average.
///
/// The deviation is rounded to one decimal before banding, and the bands are
/// checked in priority order: exactly -10 is still "good", and "danger"
/// starts strictly above 20. A zero reference yields a zero deviation and
/// "normal" regardless of current usage.
pub fn classify(current_usage: f64, reference_usage: f64) -> Classification {
    let diff_percent = if reference_usage > 0.0 {
        round1((current_usage - reference_usage) / reference_usage * 100.0)
    } else {
        0.0
    };

    let (status, message) = if diff_percent <= -10.0 {
        (Status::Good, GOOD_MESSAGE)
    } else if diff_percent > 5.0 && diff_percent <= 20.0 {
        (Status::Warning, WARNING_MESSAGE)
    } else if diff_percent > 20.0 {
        (Status::Danger, DANGER_MESSAGE)
    } else {
        (Status::Normal, NORMAL_MESSAGE)
    };

    Classification {
        diff_percent,
        status,
        message,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitComparison {
    pub unit_id: i64,
    pub unit_number: String,
    pub current_usage: f64,
    pub diff_percent: f64,
    pub status: Status,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub community_average: f64,
    pub unit_comparisons: Vec<UnitComparison>,
}

/// Benchmarks every unit of a community against the community's 30-day
/// water average. Units without readings in the window are absent; a
/// community with no recent readings reports a zero average and no units.
pub async fn community_benchmark(
    store: &dyn ReadingStore,
    community_id: i64,
    as_of: Date,
) -> Result<BenchmarkReport, StoreError> {
    let community_average = aggregate::current_average(
        store,
        Scope::Community(community_id),
        Metric::Water,
        as_of,
    )
    .await?
    .unwrap_or(0.0);

    let since = as_of - Duration::days(WINDOW_DAYS);
    let units = store.unit_water_averages(community_id, since).await?;

    let unit_comparisons = units
        .into_iter()
        .map(|unit| {
            let current_usage = round2(unit.water_usage);
            let classification = classify(current_usage, community_average);
            UnitComparison {
                unit_id: unit.unit_id,
                unit_number: unit.unit_number,
                current_usage,
                diff_percent: classification.diff_percent,
                status: classification.status,
                message: classification.message,
            }
        })
        .collect();

    Ok(BenchmarkReport {
        community_average,
        unit_comparisons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use consumption_store::MemoryStore;
    use time::macros::date;

    #[test]
    fn boundary_at_minus_ten_is_good() {
        let c = classify(90.0, 100.0);
        assert_eq!(c.diff_percent, -10.0);
        assert_eq!(c.status, Status::Good);
        assert_eq!(c.message, GOOD_MESSAGE);
    }

    #[test]
    fn boundary_at_five_is_normal() {
        let c = classify(105.0, 100.0);
        assert_eq!(c.diff_percent, 5.0);
        assert_eq!(c.status, Status::Normal);
        assert_eq!(c.message, NORMAL_MESSAGE);
    }

    #[test]
    fn boundary_at_twenty_is_warning() {
        let c = classify(120.0, 100.0);
        assert_eq!(c.diff_percent, 20.0);
        assert_eq!(c.status, Status::Warning);
        assert_eq!(c.message, WARNING_MESSAGE);
    }

    #[test]
    fn above_twenty_is_danger() {
        let c = classify(120.1, 100.0);
        assert_eq!(c.diff_percent, 20.1);
        assert_eq!(c.status, Status::Danger);
        assert_eq!(c.message, DANGER_MESSAGE);
    }

    #[test]
    fn just_below_minus_ten_stays_inside_good() {
        let c = classify(89.9, 100.0);
        assert_eq!(c.diff_percent, -10.1);
        assert_eq!(c.status, Status::Good);
    }

    #[test]
    fn strictly_between_bands_is_normal() {
        assert_eq!(classify(95.0, 100.0).status, Status::Normal);
        assert_eq!(classify(104.0, 100.0).status, Status::Normal);
    }

    #[test]
    fn rounding_happens_before_banding() {
        // 4.96% rounds to 5.0, which sits on the normal side of the band.
        let c = classify(104.96, 100.0);
        assert_eq!(c.diff_percent, 5.0);
        assert_eq!(c.status, Status::Normal);
    }

    #[test]
    fn zero_reference_is_always_normal() {
        let c = classify(500.0, 0.0);
        assert_eq!(c.diff_percent, 0.0);
        assert_eq!(c.status, Status::Normal);
        assert_eq!(c.message, NORMAL_MESSAGE);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Status::Danger).unwrap(), "danger");
        assert_eq!(serde_json::to_value(Status::Good).unwrap(), "good");
    }

    #[tokio::test]
    async fn community_benchmark_classifies_each_unit() {
        let store = MemoryStore::new();
        let community = store.insert_community("Oakwood");
        let low = store.create_unit(community, "A1").await.unwrap();
        let high = store.create_unit(community, "B2").await.unwrap();

        store
            .upsert_reading(low.id, date!(2024 - 06 - 10), 50.0, 0.0)
            .await
            .unwrap();
        store
            .upsert_reading(high.id, date!(2024 - 06 - 10), 150.0, 0.0)
            .await
            .unwrap();

        let report = community_benchmark(&store, community, date!(2024 - 06 - 30))
            .await
            .unwrap();

        assert_eq!(report.community_average, 100.0);
        assert_eq!(report.unit_comparisons.len(), 2);

        let a1 = &report.unit_comparisons[0];
        assert_eq!(a1.unit_number, "A1");
        assert_eq!(a1.current_usage, 50.0);
        assert_eq!(a1.diff_percent, -50.0);
        assert_eq!(a1.status, Status::Good);

        let b2 = &report.unit_comparisons[1];
        assert_eq!(b2.diff_percent, 50.0);
        assert_eq!(b2.status, Status::Danger);
    }

    #[tokio::test]
    async fn empty_community_reports_zeroed_defaults() {
        let store = MemoryStore::new();
        let report = community_benchmark(&store, 42, date!(2024 - 06 - 30))
            .await
            .unwrap();
        assert_eq!(report.community_average, 0.0);
        assert!(report.unit_comparisons.is_empty());
    }
}
