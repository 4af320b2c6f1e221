use crate::engine::buckets::{classify, BucketBounds, BucketSummary};
use crate::engine::compare::{compare, ComparisonRow};
use crate::engine::mode::{select_mode, AnalysisMode};
use crate::engine::normalize::EntityPeriods;
use crate::engine::sample::EntityRecord;
use crate::engine::summary::{summarize, PeriodSummary};
use serde::{Deserialize, Serialize};

/// Request-scoped inputs of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Set when the user picked a reference date range. `None` lets the data decide.
    pub comparison_requested: Option<bool>,
    pub buckets: BucketBounds,
}

/// Everything a renderer needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub mode: AnalysisMode,
    /// One row per entity that had at least one sample, in input order.
    pub rows: Vec<ComparisonRow>,
    pub buckets: BucketSummary,
    pub summary: PeriodSummary,
}

/// Run the full pipeline: normalize, compare, bucket, pick the mode.
pub fn analyze(ctx: &AnalysisContext, entities: &[EntityRecord]) -> AnalysisReport {
    let entity_periods: Vec<EntityPeriods> = entities
        .iter()
        .map(|entity| EntityPeriods::from_samples(&entity.key, &entity.samples))
        .collect();

    let mode = select_mode(&entity_periods, ctx.comparison_requested);

    let mut rows = Vec::with_capacity(entity_periods.len());
    for entity in &entity_periods {
        match compare(&entity.key, &entity.periods) {
            Ok(row) => rows.push(row),
            Err(e) => tracing::debug!(entity = %entity.key, error = %e, "Skipping entity"),
        }
    }

    let buckets = classify(&rows, &ctx.buckets);
    let summary = summarize(entities);

    tracing::debug!(
        entities = entities.len(),
        rows = rows.len(),
        mode = mode.as_str(),
        ranked = buckets.total,
        "Analysis completed"
    );

    AnalysisReport {
        mode,
        rows,
        buckets,
        summary,
    }
}
