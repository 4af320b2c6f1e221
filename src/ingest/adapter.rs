use crate::engine::sample::{ratio, EntityRecord, MetricSample};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

const KEY_FIELDS: &[&str] = &["url", "page", "keyword", "query", "key"];
const METRICS_FIELDS: &[&str] = &["metrics", "Metrics", "periods"];
const PERIOD_FIELDS: &[&str] = &["period", "Period", "periodLabel"];
const START_FIELDS: &[&str] = &["startDate", "StartDate", "start_date"];
const END_FIELDS: &[&str] = &["endDate", "EndDate", "end_date"];
const CLICKS_FIELDS: &[&str] = &["clicks", "Clicks"];
const IMPRESSIONS_FIELDS: &[&str] = &["impressions", "Impressions"];
const CTR_FIELDS: &[&str] = &["ctr", "CTR"];
const RANK_FIELDS: &[&str] = &["rank", "position", "Position"];

/// A recoverable problem found while reading the backend response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Position of the entity in the input array.
    pub index: usize,
    pub entity: Option<String>,
    pub message: String,
}

/// Canonical entities plus whatever had to be skipped to produce them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdaptedBatch {
    pub entities: Vec<EntityRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Convert raw backend entities into canonical records.
///
/// Malformed entities and metric entries are skipped with a diagnostic; the
/// rest of the batch is always processed.
pub fn adapt_entities(raw: &[Value]) -> AdaptedBatch {
    let mut batch = AdaptedBatch::default();
    for (index, value) in raw.iter().enumerate() {
        if let Some(entity) = adapt_entity(index, value, &mut batch.diagnostics) {
            batch.entities.push(entity);
        }
    }
    if !batch.diagnostics.is_empty() {
        tracing::warn!(
            skipped = batch.diagnostics.len(),
            entities = batch.entities.len(),
            "Backend response contained malformed records"
        );
    }
    batch
}

fn adapt_entity(index: usize, value: &Value, diagnostics: &mut Vec<Diagnostic>) -> Option<EntityRecord> {
    let mut report = |entity: Option<&str>, message: String| {
        tracing::warn!(index, entity = entity.unwrap_or("-"), reason = %message, "Skipping malformed record");
        diagnostics.push(Diagnostic {
            index,
            entity: entity.map(str::to_string),
            message,
        });
    };

    let Some(obj) = value.as_object() else {
        report(None, "entity is not an object".to_string());
        return None;
    };
    let Some(key) = field(obj, KEY_FIELDS).and_then(Value::as_str) else {
        report(None, "entity has no url or keyword".to_string());
        return None;
    };

    let samples = match field(obj, METRICS_FIELDS) {
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| match adapt_sample(key, None, entry) {
                Ok(sample) => Some(sample),
                Err(message) => {
                    report(Some(key), format!("metrics[{i}]: {message}"));
                    None
                }
            })
            .collect(),
        Some(Value::Object(by_period)) => by_period
            .iter()
            .filter_map(|(label, entry)| match adapt_sample(key, Some(label), entry) {
                Ok(sample) => Some(sample),
                Err(message) => {
                    report(Some(key), format!("metrics[{label}]: {message}"));
                    None
                }
            })
            .collect(),
        Some(_) => {
            report(Some(key), "metrics is neither an array nor an object".to_string());
            return None;
        }
        None => {
            report(Some(key), "entity has no metrics".to_string());
            return None;
        }
    };

    Some(EntityRecord {
        key: key.to_string(),
        samples,
    })
}

fn adapt_sample(key: &str, label_hint: Option<&str>, value: &Value) -> Result<MetricSample, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "metric entry is not an object".to_string())?;

    let period_label = field(obj, PERIOD_FIELDS)
        .and_then(Value::as_str)
        .or(label_hint)
        .map(str::to_string);
    let start_date = field(obj, START_FIELDS).and_then(parse_date);
    let end_date = field(obj, END_FIELDS).and_then(parse_date);
    if period_label.is_none() && start_date.is_none() && end_date.is_none() {
        return Err("metric entry has neither a period label nor dates".to_string());
    }

    let clicks = field(obj, CLICKS_FIELDS).map_or(0, parse_count);
    let impressions = field(obj, IMPRESSIONS_FIELDS).map_or(0, parse_count);
    let ctr = field(obj, CTR_FIELDS)
        .and_then(parse_float)
        .unwrap_or_else(|| ratio(clicks, impressions));
    let rank = field(obj, RANK_FIELDS).and_then(parse_float);

    Ok(MetricSample {
        entity_key: key.to_string(),
        period_label,
        start_date,
        end_date,
        clicks,
        impressions,
        ctr,
        rank,
    })
}

/// First non-null value among the alias names.
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

fn parse_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Non-negative integer count; negative or unparsable values become 0.
fn parse_count(value: &Value) -> u64 {
    if let Some(n) = value.as_u64() {
        return n;
    }
    match parse_float(value) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(f) if f > 0.0 => f.round() as u64,
        _ => 0,
    }
}

/// `YYYY-MM-DD`, optionally followed by a time component.
fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
