use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Thread-safe cache of serialized analysis reports with TTL-based expiration.
///
/// Analysis is a pure function of the request body, so the body digest is a
/// complete cache key. Clients choose the bodies, so the number of entries is
/// capped; a full cache evicts its oldest report.
#[derive(Clone)]
pub struct ReportCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    max_entries: usize,
}

struct CacheEntry {
    report: String,
    inserted_at: Instant,
}

/// Hex SHA-256 of a request body.
pub fn cache_key(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

impl ReportCache {
    /// Create a new cache with the given TTL in seconds and entry cap.
    /// A TTL of 0 or a cap of 0 disables caching (all lookups miss).
    pub fn new(ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_secs),
            max_entries,
        }
    }

    const fn is_disabled(&self) -> bool {
        self.ttl.is_zero() || self.max_entries == 0
    }

    /// Look up a cached report. Returns `None` if missing or expired.
    pub fn get(&self, key: &str) -> Option<String> {
        if self.is_disabled() {
            return None;
        }
        self.entries.lock().get(key).and_then(|entry| {
            if entry.inserted_at.elapsed() > self.ttl {
                None
            } else {
                Some(entry.report.clone())
            }
        })
    }

    pub fn insert(&self, key: String, report: String) {
        if self.is_disabled() {
            return;
        }
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            entries.retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
        }
        while entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            entries.remove(&oldest);
        }
        entries.insert(
            key,
            CacheEntry {
                report,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop expired reports; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
