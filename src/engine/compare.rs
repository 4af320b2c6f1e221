use crate::engine::delta::{delta_ctr_points, delta_pct, delta_rank, Delta, Polarity, Trend};
use crate::engine::sample::PeriodAggregate;
use crate::engine::EngineError;
use serde::{Deserialize, Serialize};

/// One entity across the current period (P1) and the reference period (P2).
///
/// `delta_clicks_pct` and `delta_impressions_pct` are relative changes in
/// percent. `delta_ctr_pts` is an absolute difference in percentage points,
/// since CTR is already a ratio. `delta_rank` is an absolute position change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub entity_key: String,
    pub clicks_p1: u64,
    pub clicks_p2: u64,
    pub impressions_p1: u64,
    pub impressions_p2: u64,
    pub ctr_p1: f64,
    pub ctr_p2: f64,
    pub rank_p1: Option<f64>,
    pub rank_p2: Option<f64>,
    pub delta_clicks_pct: Delta,
    pub delta_impressions_pct: Delta,
    pub delta_ctr_pts: Delta,
    pub delta_rank: Delta,
    /// Number of distinct periods the entity had data for.
    pub periods: usize,
    /// Whether a reference period (P2) exists for this entity.
    pub has_reference: bool,
}

impl ComparisonRow {
    pub fn clicks_trend(&self) -> Trend {
        self.delta_clicks_pct.trend(Polarity::HigherIsBetter)
    }

    pub fn impressions_trend(&self) -> Trend {
        self.delta_impressions_pct.trend(Polarity::HigherIsBetter)
    }

    pub fn ctr_trend(&self) -> Trend {
        self.delta_ctr_pts.trend(Polarity::HigherIsBetter)
    }

    pub fn rank_trend(&self) -> Trend {
        self.delta_rank.trend(Polarity::LowerIsBetter)
    }
}

/// Compare the newest period of an entity against its oldest one.
///
/// `periods` must be sorted oldest first. With a single period every delta is
/// `New`. With three or more, only the first and last are compared.
pub fn compare(entity_key: &str, periods: &[PeriodAggregate]) -> Result<ComparisonRow, EngineError> {
    let (Some(oldest), Some(newest)) = (periods.first(), periods.last()) else {
        return Err(EngineError::NoPeriods(entity_key.to_string()));
    };

    if periods.len() == 1 {
        return Ok(ComparisonRow {
            entity_key: entity_key.to_string(),
            clicks_p1: newest.clicks,
            clicks_p2: 0,
            impressions_p1: newest.impressions,
            impressions_p2: 0,
            ctr_p1: newest.ctr,
            ctr_p2: 0.0,
            rank_p1: newest.rank,
            rank_p2: None,
            delta_clicks_pct: Delta::New,
            delta_impressions_pct: Delta::New,
            delta_ctr_pts: Delta::New,
            delta_rank: Delta::New,
            periods: 1,
            has_reference: false,
        });
    }

    let (p1, p2) = (newest, oldest);
    #[allow(clippy::cast_precision_loss)]
    let (clicks_p1, clicks_p2, impressions_p1, impressions_p2) = (
        p1.clicks as f64,
        p2.clicks as f64,
        p1.impressions as f64,
        p2.impressions as f64,
    );

    Ok(ComparisonRow {
        entity_key: entity_key.to_string(),
        clicks_p1: p1.clicks,
        clicks_p2: p2.clicks,
        impressions_p1: p1.impressions,
        impressions_p2: p2.impressions,
        ctr_p1: p1.ctr,
        ctr_p2: p2.ctr,
        rank_p1: p1.rank,
        rank_p2: p2.rank,
        delta_clicks_pct: delta_pct(Some(clicks_p1), Some(clicks_p2)),
        delta_impressions_pct: delta_pct(Some(impressions_p1), Some(impressions_p2)),
        delta_ctr_pts: delta_ctr_points(p1.ctr, p2.ctr),
        delta_rank: delta_rank(p1.rank, p2.rank, true),
        periods: periods.len(),
        has_reference: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::normalize::{chronological, normalize};
    use crate::engine::sample::MetricSample;

    fn row_for(samples: &[MetricSample]) -> ComparisonRow {
        let periods = chronological(normalize(samples));
        compare("/a", &periods).unwrap()
    }

    #[test]
    fn test_empty_periods_is_an_error() {
        let err = compare("/a", &[]).unwrap_err();
        assert_eq!(err.to_string(), "No periods to compare for entity '/a'");
    }

    #[test]
    fn test_single_period_is_new() {
        let row = row_for(&[MetricSample::labelled("/a", "2024-01", 10, 100).with_rank(Some(5.0))]);
        assert_eq!(row.clicks_p1, 10);
        assert_eq!(row.clicks_p2, 0);
        assert_eq!(row.impressions_p2, 0);
        assert!(row.ctr_p2.abs() < f64::EPSILON);
        assert_eq!(row.rank_p1, Some(5.0));
        assert_eq!(row.rank_p2, None);
        assert_eq!(row.delta_clicks_pct, Delta::New);
        assert_eq!(row.delta_impressions_pct, Delta::New);
        assert_eq!(row.delta_ctr_pts, Delta::New);
        assert_eq!(row.delta_rank, Delta::New);
        assert!(!row.has_reference);
    }

    #[test]
    fn test_growth_between_periods() {
        let row = row_for(&[
            MetricSample::labelled("/a", "2024-01", 50, 1000).with_rank(Some(8.0)),
            MetricSample::labelled("/a", "2024-02", 100, 1000).with_rank(Some(5.0)),
        ]);
        assert_eq!(row.clicks_p1, 100);
        assert_eq!(row.clicks_p2, 50);
        assert_eq!(row.delta_clicks_pct, Delta::Value(100.0));
        assert_eq!(row.delta_impressions_pct, Delta::Value(0.0));
        assert_eq!(row.delta_rank, Delta::Value(-3.0));
        assert!((row.delta_ctr_pts.value().unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(row.rank_trend(), Trend::Positive);
        assert_eq!(row.clicks_trend(), Trend::Positive);
        assert_eq!(row.impressions_trend(), Trend::Neutral);
    }

    #[test]
    fn test_zero_reference_growth() {
        let row = row_for(&[
            MetricSample::labelled("/a", "2024-01", 0, 0),
            MetricSample::labelled("/a", "2024-02", 5, 50),
        ]);
        assert_eq!(row.delta_clicks_pct, Delta::Infinity);
        assert_eq!(row.delta_impressions_pct, Delta::Infinity);
        assert!((row.delta_ctr_pts.value().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_lost_ranking() {
        let row = row_for(&[
            MetricSample::labelled("/a", "2024-01", 1, 10).with_rank(Some(4.0)),
            MetricSample::labelled("/a", "2024-02", 0, 0),
        ]);
        assert_eq!(row.delta_rank, Delta::Lost);
        assert_eq!(row.rank_trend(), Trend::Lost);
        assert_eq!(row.delta_clicks_pct, Delta::Value(-100.0));
    }

    #[test]
    fn test_newly_ranked() {
        let row = row_for(&[
            MetricSample::labelled("/a", "2024-01", 0, 10),
            MetricSample::labelled("/a", "2024-02", 1, 10).with_rank(Some(12.0)),
        ]);
        assert_eq!(row.delta_rank, Delta::New);
    }

    #[test]
    fn test_zero_rank_is_not_missing() {
        let row = row_for(&[
            MetricSample::labelled("/a", "2024-01", 1, 10).with_rank(Some(2.0)),
            MetricSample::labelled("/a", "2024-02", 1, 10).with_rank(Some(0.0)),
        ]);
        assert_eq!(row.rank_p1, Some(0.0));
        assert_eq!(row.delta_rank, Delta::Value(-2.0));
    }

    #[test]
    fn test_intermediate_periods_are_ignored() {
        let row = row_for(&[
            MetricSample::labelled("/a", "2024-01", 10, 100),
            MetricSample::labelled("/a", "2024-02", 999, 9999),
            MetricSample::labelled("/a", "2024-03", 20, 100),
        ]);
        assert_eq!(row.clicks_p1, 20);
        assert_eq!(row.clicks_p2, 10);
        assert_eq!(row.periods, 3);
        assert_eq!(row.delta_clicks_pct, Delta::Value(100.0));
    }

    #[test]
    fn test_unranked_in_both_periods_is_lost() {
        let row = row_for(&[
            MetricSample::labelled("/a", "2024-01", 1, 10),
            MetricSample::labelled("/a", "2024-02", 1, 10),
        ]);
        assert_eq!(row.delta_rank, Delta::Lost);
    }

    #[test]
    fn test_inconsistent_counts_propagate() {
        let row = row_for(&[
            MetricSample::labelled("/a", "2024-01", 20, 10),
            MetricSample::labelled("/a", "2024-02", 40, 10),
        ]);
        assert_eq!(row.clicks_p1, 40);
        assert_eq!(row.delta_clicks_pct, Delta::Value(100.0));
        assert!((row.ctr_p1 - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_row_serializes_sentinels() {
        let row = row_for(&[MetricSample::labelled("/a", "2024-01", 10, 100)]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["delta_clicks_pct"], "New");
        assert_eq!(json["delta_rank"], "New");
        assert_eq!(json["rank_p2"], serde_json::Value::Null);
    }
}
