//! Period-comparison engine.
//!
//! Pure, synchronous transformations from per-entity metric samples to
//! comparison rows, rank buckets and an analysis mode. Nothing here performs
//! I/O or keeps state between calls.

pub mod analysis;
pub mod buckets;
pub mod compare;
pub mod delta;
pub mod mode;
pub mod normalize;
pub mod sample;
pub mod summary;

pub use analysis::{analyze, AnalysisContext, AnalysisReport};
pub use buckets::{BucketBounds, BucketStat, BucketSummary};
pub use compare::ComparisonRow;
pub use delta::{Delta, Polarity, Trend};
pub use mode::AnalysisMode;
pub use sample::{EntityRecord, MetricSample, PeriodAggregate};

/// Misuse of the engine API. Data problems never end up here; they resolve to
/// sentinel deltas instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The comparator was handed an empty period list.
    NoPeriods(String),
    InvalidBuckets(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPeriods(entity) => write!(f, "No periods to compare for entity '{entity}'"),
            Self::InvalidBuckets(msg) => write!(f, "Invalid rank buckets: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
