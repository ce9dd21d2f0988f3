//! Memoisation of cut results.
//!
//! Cuts are keyed by the workflow fingerprint and the requested features, so
//! repeated planning of an unchanged workflow returns the stored result
//! instead of walking the graph again.

use super::CutDag;
use crate::core::FeatureId;
use crate::workflow::WorkflowGraph;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache key: graph content plus requested features.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    fingerprint: String,
    results: Vec<FeatureId>,
}

impl PlanKey {
    /// Builds the key for planning `results` on `graph`.
    ///
    /// Requested features are sorted and deduplicated, as their order does
    /// not affect the cut.
    #[must_use]
    pub fn new(graph: &WorkflowGraph, results: &[FeatureId]) -> Self {
        let mut results = results.to_vec();
        results.sort_unstable();
        results.dedup();
        Self {
            fingerprint: graph.fingerprint(),
            results,
        }
    }

    /// Returns the graph fingerprint part of the key.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Hit/miss counters of a [`PlanCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Stored entries.
    pub entries: usize,
}

/// Concurrent in-memory store of cut results.
#[derive(Debug, Default)]
pub struct PlanCache {
    entries: DashMap<PlanKey, Arc<CutDag>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlanCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a cut.
    #[must_use]
    pub fn get(&self, key: &PlanKey) -> Option<Arc<CutDag>> {
        let found = self.entries.get(key).map(|entry| Arc::clone(entry.value()));
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Stores a cut.
    pub fn insert(&self, key: PlanKey, cut: Arc<CutDag>) {
        self.entries.insert(key, cut);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::FeatureType;
    use crate::workflow::{FeatureSpec, WorkflowBuilder};

    fn graph() -> WorkflowGraph {
        WorkflowBuilder::new("cache")
            .raw_feature(FeatureSpec::predictor("a", FeatureType::Real))
            .unwrap()
            .raw_feature(FeatureSpec::predictor("b", FeatureType::Real))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_plan_key_ignores_request_order() {
        let graph = graph();
        let ab = PlanKey::new(&graph, &graph.feature_ids(["a", "b", "a"]));
        let ba = PlanKey::new(&graph, &graph.feature_ids(["b", "a"]));

        assert_eq!(ab, ba);
        assert_eq!(ab.fingerprint(), graph.fingerprint());
    }

    #[test]
    fn test_cache_basic() {
        let graph = graph();
        let cache = PlanCache::new();
        let key = PlanKey::new(&graph, &graph.feature_ids(["a"]));

        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());

        cache.insert(key.clone(), Arc::new(CutDag::empty()));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key).is_some());

        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, entries: 1 });

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }
}
