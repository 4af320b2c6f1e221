use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observation of one entity (page URL or keyword) in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub entity_key: String,
    pub period_label: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub clicks: u64,
    pub impressions: u64,
    /// Click-through rate as a 0..1 fraction, never a percentage.
    pub ctr: f64,
    /// Average position. `None` means "not found"; `Some(0.0)` is a featured placement.
    pub rank: Option<f64>,
}

impl MetricSample {
    /// Sample for an explicitly labelled period (e.g. "P1").
    pub fn labelled(entity_key: &str, label: &str, clicks: u64, impressions: u64) -> Self {
        Self {
            entity_key: entity_key.to_string(),
            period_label: Some(label.to_string()),
            start_date: None,
            end_date: None,
            clicks,
            impressions,
            ctr: ratio(clicks, impressions),
            rank: None,
        }
    }

    /// Sample for a period identified only by its date range.
    pub fn dated(
        entity_key: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        clicks: u64,
        impressions: u64,
    ) -> Self {
        Self {
            entity_key: entity_key.to_string(),
            period_label: None,
            start_date: Some(start_date),
            end_date: Some(end_date),
            clicks,
            impressions,
            ctr: ratio(clicks, impressions),
            rank: None,
        }
    }

    #[must_use]
    pub fn with_rank(mut self, rank: Option<f64>) -> Self {
        self.rank = rank;
        self
    }

    /// Key used to group samples of the same period.
    ///
    /// The label wins when present; otherwise the date range is rendered as
    /// `"{start} to {end}"`, with `unknown` standing in for a missing date.
    pub fn period_key(&self) -> String {
        if let Some(label) = &self.period_label {
            return label.clone();
        }
        format!(
            "{} to {}",
            format_date(self.start_date),
            format_date(self.end_date)
        )
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "unknown".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// `clicks / impressions`, or 0 when there were no impressions.
pub fn ratio(clicks: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ctr = clicks as f64 / impressions as f64;
    ctr
}

/// An entity (page or keyword) with every sample the data source returned for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub key: String,
    pub samples: Vec<MetricSample>,
}

/// All samples of one entity in one period merged into a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    /// Period key the samples were grouped under.
    pub key: String,
    pub period_label: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub rank: Option<f64>,
}

impl PeriodAggregate {
    /// True when the period recorded any traffic at all.
    pub const fn has_traffic(&self) -> bool {
        self.clicks > 0 || self.impressions > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_key_prefers_label() {
        let mut sample = MetricSample::dated("/a", date(2024, 1, 1), date(2024, 1, 31), 1, 10);
        sample.period_label = Some("P1".to_string());
        assert_eq!(sample.period_key(), "P1");
    }

    #[test]
    fn test_period_key_from_dates() {
        let sample = MetricSample::dated("/a", date(2024, 1, 1), date(2024, 1, 31), 1, 10);
        assert_eq!(sample.period_key(), "2024-01-01 to 2024-01-31");
    }

    #[test]
    fn test_period_key_missing_dates() {
        let mut sample = MetricSample::labelled("/a", "x", 0, 0);
        sample.period_label = None;
        sample.start_date = Some(date(2024, 3, 1));
        assert_eq!(sample.period_key(), "2024-03-01 to unknown");
    }

    #[test]
    fn test_ratio_zero_impressions() {
        assert!(ratio(5, 0).abs() < f64::EPSILON);
        assert!((ratio(10, 100) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_allows_clicks_above_impressions() {
        assert!((ratio(20, 10) - 2.0).abs() < f64::EPSILON);
    }
}
