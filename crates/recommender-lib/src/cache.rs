//! Last-recommendation slot shared by the inference and status paths
//!
//! Holds at most one value. Writes replace the whole result with an atomic
//! pointer swap, so readers see either the previous or the new result and
//! neither side ever waits on the other.

use crate::models::RecommendationResult;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Handle to the shared slot; clones observe the same value
#[derive(Debug, Clone, Default)]
pub struct RecommendationCache {
    slot: Arc<ArcSwapOption<RecommendationResult>>,
}

impl RecommendationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached result unconditionally
    pub fn set(&self, result: impl Into<Arc<RecommendationResult>>) {
        self.slot.store(Some(result.into()));
    }

    /// Latest result, or `None` if nothing has been cached yet
    pub fn get(&self) -> Option<Arc<RecommendationResult>> {
        self.slot.load_full()
    }

    pub fn is_populated(&self) -> bool {
        self.slot.load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Recommendation, RelevantMetrics};
    use serde_json::json;
    use std::thread;

    fn result(n: usize) -> RecommendationResult {
        RecommendationResult {
            instance_id: format!("i-{n}"),
            metrics: RelevantMetrics {
                cpu_utilization: Some(json!(n)),
                ..Default::default()
            },
            recommendation: Recommendation {
                compute_class: format!("compute-{n}"),
                storage_class: format!("storage-{n}"),
                scaling_action: format!("scaling-{n}"),
            },
        }
    }

    #[test]
    fn test_empty_before_first_set() {
        let cache = RecommendationCache::new();
        assert!(cache.get().is_none());
        assert!(!cache.is_populated());
    }

    #[test]
    fn test_round_trip() {
        let cache = RecommendationCache::new();
        cache.set(result(1));
        assert_eq!(*cache.get().unwrap(), result(1));
    }

    #[test]
    fn test_latest_write_wins() {
        let cache = RecommendationCache::new();
        cache.set(result(1));
        cache.set(result(2));
        assert_eq!(cache.get().unwrap().instance_id, "i-2");
    }

    #[test]
    fn test_clones_share_slot() {
        let cache = RecommendationCache::new();
        let handle = cache.clone();
        handle.set(result(7));
        assert_eq!(cache.get().unwrap().instance_id, "i-7");
    }

    #[test]
    fn test_reader_keeps_snapshot_after_overwrite() {
        let cache = RecommendationCache::new();
        cache.set(result(1));
        let snapshot = cache.get().unwrap();
        cache.set(result(2));
        assert_eq!(snapshot.instance_id, "i-1");
    }

    #[test]
    fn test_concurrent_writes_never_tear() {
        let cache = RecommendationCache::new();
        let writers: Vec<_> = (0..16)
            .map(|n| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        cache.set(result(n));
                    }
                })
            })
            .collect();

        let reader = {
            let cache = cache.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    if let Some(seen) = cache.get() {
                        let n = seen.instance_id.trim_start_matches("i-").to_string();
                        assert_eq!(seen.recommendation.compute_class, format!("compute-{n}"));
                        assert_eq!(seen.recommendation.scaling_action, format!("scaling-{n}"));
                    }
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        let last = cache.get().unwrap();
        let n: usize = last.instance_id.trim_start_matches("i-").parse().unwrap();
        assert!(n < 16);
        assert_eq!(*last, result(n));
    }
}
