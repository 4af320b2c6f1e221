use crate::engine::normalize::EntityPeriods;
use serde::{Deserialize, Serialize};

/// How the result set should be presented.
///
/// Purely a presentation hint: rows and buckets are computed in full
/// regardless of the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Empty,
    Single,
    Comparison,
}

impl AnalysisMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Single => "single",
            Self::Comparison => "comparison",
        }
    }
}

/// Decide the analysis mode for a set of entities.
///
/// An explicit comparison request wins over the data, so headers stay
/// consistent with the chosen date range even when the reference period came
/// back empty. Without one, the run is a comparison as soon as some entity has
/// an oldest period with any clicks or impressions behind a newer one.
pub fn select_mode(entities: &[EntityPeriods], comparison_requested: Option<bool>) -> AnalysisMode {
    if entities.is_empty() {
        return AnalysisMode::Empty;
    }
    if comparison_requested == Some(true) {
        return AnalysisMode::Comparison;
    }
    let has_reference_data = entities
        .iter()
        .filter_map(EntityPeriods::reference)
        .any(|reference| reference.has_traffic());
    if has_reference_data {
        AnalysisMode::Comparison
    } else {
        AnalysisMode::Single
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sample::MetricSample;

    fn entity(key: &str, periods: &[(&str, u64, u64)]) -> EntityPeriods {
        let samples: Vec<MetricSample> = periods
            .iter()
            .map(|(label, clicks, impressions)| MetricSample::labelled(key, label, *clicks, *impressions))
            .collect();
        EntityPeriods::from_samples(key, &samples)
    }

    #[test]
    fn test_empty_collection() {
        assert_eq!(select_mode(&[], Some(true)), AnalysisMode::Empty);
        assert_eq!(select_mode(&[], None), AnalysisMode::Empty);
    }

    #[test]
    fn test_single_period_data() {
        let entities = vec![entity("/a", &[("P1", 10, 100)]), entity("/b", &[("P1", 1, 5)])];
        assert_eq!(select_mode(&entities, None), AnalysisMode::Single);
        assert_eq!(select_mode(&entities, Some(false)), AnalysisMode::Single);
    }

    #[test]
    fn test_explicit_request_overrides_data() {
        let entities = vec![entity("/a", &[("P1", 10, 100)])];
        assert_eq!(select_mode(&entities, Some(true)), AnalysisMode::Comparison);
    }

    #[test]
    fn test_inferred_comparison() {
        let entities = vec![
            entity("/a", &[("P1", 10, 100)]),
            entity("/b", &[("P1", 0, 3), ("P2", 4, 40)]),
        ];
        assert_eq!(select_mode(&entities, None), AnalysisMode::Comparison);
    }

    #[test]
    fn test_empty_reference_period_is_single() {
        let entities = vec![entity("/a", &[("P1", 0, 0), ("P2", 4, 40)])];
        assert_eq!(select_mode(&entities, None), AnalysisMode::Single);
    }

    #[test]
    fn test_entity_without_samples_still_counts() {
        let entities = vec![EntityPeriods::from_samples("/a", &[])];
        assert_eq!(select_mode(&entities, None), AnalysisMode::Single);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(AnalysisMode::Comparison.as_str(), "comparison");
        assert_eq!(
            serde_json::to_string(&AnalysisMode::Single).unwrap(),
            "\"single\""
        );
    }
}
