use crate::engine::compare::ComparisonRow;
use crate::engine::EngineError;
use serde::{Deserialize, Serialize};

/// Rank bucket definition as ascending inclusive upper bounds.
///
/// `[3, 10, 20]` describes the buckets 1-3, 4-10, 11-20 and an open-ended
/// 21+. A rank belongs to the first bucket whose bound it does not exceed,
/// so a featured rank of 0 falls into the first bucket and a fractional
/// average such as 3.4 into the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct BucketBounds {
    upper: Vec<u32>,
}

impl BucketBounds {
    pub fn new(upper: Vec<u32>) -> Result<Self, EngineError> {
        if upper.is_empty() {
            return Err(EngineError::InvalidBuckets(
                "at least one bucket bound is required".to_string(),
            ));
        }
        if upper.contains(&0) {
            return Err(EngineError::InvalidBuckets(
                "bucket bounds must be positive".to_string(),
            ));
        }
        if upper.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EngineError::InvalidBuckets(format!(
                "bucket bounds must be strictly ascending: {upper:?}"
            )));
        }
        Ok(Self { upper })
    }

    /// Display labels such as `"1-3"` and `"21+"`.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.upper.len() + 1);
        let mut lower = 1;
        for &upper in &self.upper {
            if lower == upper {
                labels.push(format!("{upper}"));
            } else {
                labels.push(format!("{lower}-{upper}"));
            }
            lower = upper + 1;
        }
        labels.push(format!("{lower}+"));
        labels
    }

    /// Index of the bucket `rank` falls into.
    pub fn index_of(&self, rank: f64) -> usize {
        self.upper
            .iter()
            .position(|&upper| rank <= f64::from(upper))
            .unwrap_or(self.upper.len())
    }
}

impl Default for BucketBounds {
    fn default() -> Self {
        Self {
            upper: vec![3, 10, 20],
        }
    }
}

impl TryFrom<Vec<u32>> for BucketBounds {
    type Error = EngineError;

    fn try_from(upper: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(upper)
    }
}

impl From<BucketBounds> for Vec<u32> {
    fn from(bounds: BucketBounds) -> Self {
        bounds.upper
    }
}

/// Entity counts for one rank bucket.
///
/// `new`, `lost`, `stay`, `moved_in` and `moved_out` stay at 0 unless a
/// comparison is active, and never count the same entity twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStat {
    pub bucket: String,
    /// Entities whose current rank is in the bucket.
    pub current: usize,
    /// Ranked in the bucket now, unranked in the reference period.
    pub new: usize,
    /// Ranked in the bucket in the reference period, unranked now.
    pub lost: usize,
    /// In the bucket in both periods.
    pub stay: usize,
    /// In the bucket now, in a different bucket in the reference period.
    pub moved_in: usize,
    /// In the bucket in the reference period, in a different bucket now.
    pub moved_out: usize,
}

/// Bucket counts for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub buckets: Vec<BucketStat>,
    /// Entities with a current rank, across all buckets.
    pub total: usize,
    pub comparison_active: bool,
}

/// Classify rows into rank buckets by their current rank.
pub fn classify(rows: &[ComparisonRow], bounds: &BucketBounds) -> BucketSummary {
    let mut buckets: Vec<BucketStat> = bounds
        .labels()
        .into_iter()
        .map(|bucket| BucketStat {
            bucket,
            current: 0,
            new: 0,
            lost: 0,
            stay: 0,
            moved_in: 0,
            moved_out: 0,
        })
        .collect();
    let comparison_active = rows.iter().any(|row| row.has_reference);
    let mut total = 0;

    for row in rows {
        let now = row.rank_p1.map(|rank| bounds.index_of(rank));
        let before = if comparison_active {
            row.rank_p2.map(|rank| bounds.index_of(rank))
        } else {
            None
        };

        if let Some(now) = now {
            buckets[now].current += 1;
            total += 1;
        }
        if !comparison_active {
            continue;
        }

        match (now, before) {
            (Some(now), None) => buckets[now].new += 1,
            (None, Some(before)) => buckets[before].lost += 1,
            (Some(now), Some(before)) if now == before => buckets[now].stay += 1,
            (Some(now), Some(before)) => {
                buckets[now].moved_in += 1;
                buckets[before].moved_out += 1;
            }
            (None, None) => {}
        }
    }

    BucketSummary {
        buckets,
        total,
        comparison_active,
    }
}
