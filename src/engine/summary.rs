use crate::engine::compare::{compare, ComparisonRow};
use crate::engine::normalize::{chronological, normalize};
use crate::engine::sample::{EntityRecord, PeriodAggregate};
use serde::{Deserialize, Serialize};

/// Entity key used for the site-wide comparison row.
pub const TOTAL_KEY: &str = "(total)";

/// Site-wide totals per period across every entity of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// Per-period totals, oldest first.
    pub periods: Vec<PeriodAggregate>,
    /// Newest vs oldest totals. `None` when the run has no samples at all.
    pub comparison: Option<ComparisonRow>,
}

/// Merge all samples of all entities by period and compare the totals.
pub fn summarize(entities: &[EntityRecord]) -> PeriodSummary {
    let periods = chronological(normalize(
        entities.iter().flat_map(|entity| entity.samples.iter()),
    ));
    let comparison = compare(TOTAL_KEY, &periods).ok();
    PeriodSummary {
        periods,
        comparison,
    }
}
