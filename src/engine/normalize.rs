use crate::engine::sample::{ratio, MetricSample, PeriodAggregate};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One entity's period aggregates, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPeriods {
    pub key: String,
    pub periods: Vec<PeriodAggregate>,
}

impl EntityPeriods {
    pub fn from_samples(key: &str, samples: &[MetricSample]) -> Self {
        Self {
            key: key.to_string(),
            periods: chronological(normalize(samples)),
        }
    }

    /// The oldest period, used as the comparison reference.
    pub fn reference(&self) -> Option<&PeriodAggregate> {
        if self.periods.len() < 2 {
            return None;
        }
        self.periods.first()
    }
}

/// Group samples by period key and merge each group into one aggregate.
///
/// Clicks and impressions are summed. CTR is recomputed from the sums and rank
/// is the impression-weighted mean of the ranked samples divided by all
/// impressions of the period, so unranked samples only widen the denominator.
/// No samples means no aggregates.
pub fn normalize<'a, I>(samples: I) -> BTreeMap<String, PeriodAggregate>
where
    I: IntoIterator<Item = &'a MetricSample>,
{
    let mut groups: BTreeMap<String, Vec<&MetricSample>> = BTreeMap::new();
    for sample in samples {
        groups.entry(sample.period_key()).or_default().push(sample);
    }

    groups
        .into_iter()
        .map(|(key, mut group)| {
            // Float sums depend on order; fix it so the result does not.
            group.sort_by(|a, b| sample_order(a, b));
            let aggregate = merge(key.clone(), &group);
            (key, aggregate)
        })
        .collect()
}

/// Aggregates ordered oldest first.
///
/// Dated periods sort by start date (then end date); periods without a start
/// date come after all dated ones, in lexical order of their key.
///
/// Lexical order treats labels as time: `"P1"` sorts before `"P2"` and so
/// becomes the reference period, even when a caller means `P1` as the current
/// one. Callers that label periods that way must also send dates, or labels
/// that sort oldest first such as `"2024-01"`.
pub fn chronological(aggregates: BTreeMap<String, PeriodAggregate>) -> Vec<PeriodAggregate> {
    let mut periods: Vec<PeriodAggregate> = aggregates.into_values().collect();
    periods.sort_by(|a, b| {
        (a.start_date.is_none(), a.start_date, a.end_date)
            .cmp(&(b.start_date.is_none(), b.start_date, b.end_date))
            .then_with(|| a.key.cmp(&b.key))
    });
    periods
}

fn sample_order(a: &MetricSample, b: &MetricSample) -> Ordering {
    (a.start_date, a.end_date, a.clicks, a.impressions)
        .cmp(&(b.start_date, b.end_date, b.clicks, b.impressions))
        .then_with(|| match (a.rank, b.rank) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (x, y) => x.is_some().cmp(&y.is_some()),
        })
        .then_with(|| a.ctr.total_cmp(&b.ctr))
}

fn merge(key: String, group: &[&MetricSample]) -> PeriodAggregate {
    let mut clicks: u64 = 0;
    let mut impressions: u64 = 0;
    let mut weighted_rank = 0.0;
    let mut ranked_impressions: u64 = 0;
    let mut plain_rank_sum = 0.0;
    let mut ranked_count: u32 = 0;

    for sample in group {
        clicks = clicks.saturating_add(sample.clicks);
        impressions = impressions.saturating_add(sample.impressions);
        if let Some(rank) = sample.rank {
            #[allow(clippy::cast_precision_loss)]
            let weight = sample.impressions as f64;
            weighted_rank = rank.mul_add(weight, weighted_rank);
            ranked_impressions = ranked_impressions.saturating_add(sample.impressions);
            plain_rank_sum += rank;
            ranked_count += 1;
        }
    }

    let rank = if ranked_count == 0 {
        None
    } else if ranked_impressions == 0 {
        // Ranked but never shown: weighting is meaningless, keep the plain mean.
        Some(plain_rank_sum / f64::from(ranked_count))
    } else {
        #[allow(clippy::cast_precision_loss)]
        let total = impressions as f64;
        Some(weighted_rank / total)
    };

    PeriodAggregate {
        key,
        period_label: group.iter().find_map(|s| s.period_label.clone()),
        start_date: group.iter().filter_map(|s| s.start_date).min(),
        end_date: group.iter().filter_map(|s| s.end_date).max(),
        clicks,
        impressions,
        ctr: ratio(clicks, impressions),
        rank,
    }
}
