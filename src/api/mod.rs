pub mod analyze;
pub mod errors;

use crate::cache::ReportCache;
use crate::config::Config;
use crate::engine::BucketBounds;
use std::time::Duration;

/// Shared application state for the HTTP handlers.
pub struct AppState {
    pub cache: ReportCache,
    pub default_buckets: BucketBounds,
    pub dashboard_origin: Option<String>,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache: ReportCache::new(config.cache_ttl_secs, config.cache_max_entries),
            default_buckets: config.bucket_bounds(),
            dashboard_origin: config.dashboard_origin.clone(),
            max_body_bytes: config.max_body_bytes,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}
