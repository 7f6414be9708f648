//! Snapshot-version-keyed cache for analytics results.
//!
//! Entries are invalidated wholesale when the snapshot version advances:
//! a lookup carrying a newer version clears everything cached for the old
//! one. Hit/miss counters back the facade's instrumentation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::centrality::CentralityReport;
use crate::impact::ImpactReport;
use crate::recommend::Recommendation;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub algorithm: &'static str,
    /// Serialized parameter fingerprint.
    pub params: String,
}

#[derive(Clone)]
pub enum CachedResult {
    Centrality(Arc<CentralityReport>),
    Impact(Arc<ImpactReport>),
    Recommendations(Arc<Vec<Recommendation>>),
}

#[derive(Default)]
struct CacheState {
    version: u64,
    entries: AHashMap<CacheKey, CachedResult>,
}

#[derive(Default)]
pub struct AnalyticsCache {
    inner: RwLock<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnalyticsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: u64, key: &CacheKey) -> Option<CachedResult> {
        {
            let state = self.inner.read();
            if state.version == version {
                if let Some(entry) = state.entries.get(key) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.clone());
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }
        let mut state = self.inner.write();
        // only ever roll the cache forward; a reader holding an older
        // snapshot just misses
        if state.version < version {
            tracing::debug!(
                from = state.version,
                to = version,
                dropped = state.entries.len(),
                "analytics cache invalidated"
            );
            state.entries.clear();
            state.version = version;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, version: u64, key: CacheKey, value: CachedResult) {
        let mut state = self.inner.write();
        if state.version > version {
            // a newer snapshot superseded this result while it was computing
            return;
        }
        if state.version < version {
            state.entries.clear();
            state.version = version;
        }
        state.entries.insert(key, value);
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centrality::CentralityReport;

    fn key(params: &str) -> CacheKey {
        CacheKey {
            algorithm: "centrality",
            params: params.to_string(),
        }
    }

    fn report(version: u64) -> CachedResult {
        CachedResult::Centrality(Arc::new(CentralityReport {
            snapshot_version: version,
            partial: false,
            scores: Vec::new(),
        }))
    }

    #[test]
    fn test_hit_after_insert_same_version() {
        let cache = AnalyticsCache::new();
        assert!(cache.get(1, &key("default")).is_none());
        cache.insert(1, key("default"), report(1));
        assert!(cache.get(1, &key("default")).is_some());
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.miss_count(), 1);
    }

    #[test]
    fn test_version_advance_clears_entries() {
        let cache = AnalyticsCache::new();
        cache.insert(1, key("default"), report(1));
        assert!(cache.get(2, &key("default")).is_none());
        assert!(cache.is_empty());
        // the old version is gone even if asked for again
        assert!(cache.get(1, &key("default")).is_none());
    }

    #[test]
    fn test_stale_insert_is_dropped() {
        let cache = AnalyticsCache::new();
        assert!(cache.get(5, &key("default")).is_none());
        cache.insert(3, key("default"), report(3));
        assert!(cache.is_empty());
    }
}
