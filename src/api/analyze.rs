use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::cache::cache_key;
use crate::engine::{analyze, AnalysisContext, AnalysisReport, BucketBounds};
use crate::ingest::adapter::{adapt_entities, Diagnostic};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// What the entity keys of a request are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Pages,
    Keywords,
}

/// Body of `POST /api/analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub kind: EntityKind,
    /// True when the user selected a reference date range.
    #[serde(default)]
    pub comparison: Option<bool>,
    /// Rank bucket upper bounds; the configured default when absent.
    #[serde(default)]
    pub buckets: Option<Vec<u32>>,
    /// Raw entities as returned by the Search Console backend.
    pub entities: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub kind: EntityKind,
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub diagnostics: Vec<Diagnostic>,
}

/// POST /api/analyze: compare periods, bucket ranks and pick the display mode.
pub async fn post_analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let deadline = Instant::now().checked_add(state.request_timeout);
    let key = cache_key(&body);
    if let Some(cached) = state.cache.get(&key) {
        tracing::debug!(cache_key = %key, "Serving cached report");
        return Ok(json_response(cached));
    }

    let request: AnalyzeRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?;

    let buckets = match request.buckets {
        Some(bounds) => BucketBounds::new(bounds)?,
        None => state.default_buckets.clone(),
    };
    let ctx = AnalysisContext {
        comparison_requested: request.comparison,
        buckets,
    };
    let kind = request.kind;
    let raw_entities = request.entities;

    let response = tokio::task::spawn_blocking(move || {
        run_analysis(&ctx, kind, &raw_entities, deadline)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Analysis task panicked: {e}")))??;

    tracing::info!(
        kind = ?response.kind,
        mode = response.report.mode.as_str(),
        rows = response.report.rows.len(),
        skipped = response.diagnostics.len(),
        "Analysis served"
    );

    let serialized = serde_json::to_string(&response)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize report: {e}")))?;
    state.cache.insert(key, serialized.clone());
    Ok(json_response(serialized))
}

/// Adapt and analyze, giving up between stages once `deadline` has passed.
/// `None` means no deadline.
///
/// The blocking task outlives a 408 from the timeout layer.
fn run_analysis(
    ctx: &AnalysisContext,
    kind: EntityKind,
    raw_entities: &[Value],
    deadline: Option<Instant>,
) -> Result<AnalyzeResponse, ApiError> {
    check_deadline(deadline, "adapt")?;
    let batch = adapt_entities(raw_entities);
    check_deadline(deadline, "analyze")?;
    let report = analyze(ctx, &batch.entities);
    Ok(AnalyzeResponse {
        kind,
        report,
        diagnostics: batch.diagnostics,
    })
}

fn check_deadline(deadline: Option<Instant>, stage: &'static str) -> Result<(), ApiError> {
    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        tracing::warn!(stage, "Request deadline passed, abandoning analysis");
        return Err(ApiError::Timeout);
    }
    Ok(())
}

fn json_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}
