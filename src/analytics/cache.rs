//! Content-addressed memo of analysis results.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use sha2::{Digest, Sha256};

use crate::models::{AnalysisResult, Reading};

// ---

/// Total order used to canonicalise a reading set.
pub fn canonical_order(a: &Reading, b: &Reading) -> std::cmp::Ordering {
    let opt = |a: Option<f64>, b: Option<f64>| match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    };
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.location.cmp(&b.location))
        .then_with(|| a.value.total_cmp(&b.value))
        .then_with(|| opt(a.x, b.x))
        .then_with(|| opt(a.y, b.y))
        .then_with(|| opt(a.z, b.z))
}

/// SHA-256 over the canonically ordered reading tuples, hex encoded.
///
/// Structurally identical reading sets produce the same key regardless of
/// order or where they were fetched from.
pub fn fingerprint(readings: &[Reading]) -> String {
    // ---
    let mut ordered: Vec<&Reading> = readings.iter().collect();
    ordered.sort_by(|a, b| canonical_order(a, b));

    let mut hasher = Sha256::new();
    hasher.update((ordered.len() as u64).to_le_bytes());
    for r in ordered {
        hasher.update(r.timestamp.timestamp().to_le_bytes());
        hasher.update(r.timestamp.timestamp_subsec_nanos().to_le_bytes());
        hasher.update((r.location.len() as u64).to_le_bytes());
        hasher.update(r.location.as_bytes());
        hasher.update(r.value.to_bits().to_le_bytes());
        for coord in [r.x, r.y, r.z] {
            match coord {
                Some(v) => {
                    hasher.update([1u8]);
                    hasher.update(v.to_bits().to_le_bytes());
                }
                None => hasher.update([0u8]),
            }
        }
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Arc<AnalysisResult>>,
    order: VecDeque<String>,
}

/// Bounded map from fingerprint to result, safe for concurrent use.
///
/// Inserts never replace an existing entry, so racing writers for the same
/// key all end up holding the first stored value. When full, the oldest
/// insert is evicted.
pub struct AnalysisCache {
    max_entries: usize,
    entries: RwLock<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnalysisCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: RwLock::new(Entries::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<AnalysisResult>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let found = entries.map.get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store `value` unless `key` is already present; returns the stored value.
    pub fn insert_if_absent(&self, key: String, value: AnalysisResult) -> Arc<AnalysisResult> {
        // ---
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.map.get(&key) {
            return Arc::clone(existing);
        }

        while entries.map.len() >= self.max_entries {
            match entries.order.pop_front() {
                Some(victim) => {
                    entries.map.remove(&victim);
                }
                None => break,
            }
        }

        let value = Arc::new(value);
        entries.order.push_back(key.clone());
        entries.map.insert(key, Arc::clone(&value));
        value
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` since construction.
    pub fn counters(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{Statistics, Trends};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn result(count: usize) -> AnalysisResult {
        AnalysisResult {
            trends: Trends::default(),
            hotspots: Vec::new(),
            statistics: Statistics::default(),
            reading_count: count,
            timestamp: at(0),
        }
    }

    #[test]
    fn test_fingerprint_is_content_based() {
        // ---
        let a = vec![
            Reading::new("Kitchen", 18.0, at(0)),
            Reading::new("Bath", 20.0, at(1)).at(1.0, 2.0),
        ];
        let b: Vec<Reading> = a.iter().rev().cloned().collect();
        assert_eq!(fingerprint(&a), fingerprint(&b));

        let mut c = a.clone();
        c[1].z = Some(0.0);
        assert_ne!(fingerprint(&a), fingerprint(&c));

        let mut d = a.clone();
        d[0].value = 18.5;
        assert_ne!(fingerprint(&a), fingerprint(&d));
    }

    #[test]
    fn test_fingerprint_distinguishes_location_boundaries() {
        // ---
        let a = vec![Reading::new("ab", 1.0, at(0)), Reading::new("c", 1.0, at(0))];
        let b = vec![Reading::new("a", 1.0, at(0)), Reading::new("bc", 1.0, at(0))];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_insert_if_absent_keeps_first_value() {
        // ---
        let cache = AnalysisCache::new(4);
        let first = cache.insert_if_absent("k".into(), result(1));
        let second = cache.insert_if_absent("k".into(), result(2));

        assert_eq!(first.reading_count, 1);
        assert_eq!(second.reading_count, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_oldest_entry_is_evicted() {
        // ---
        let cache = AnalysisCache::new(2);
        cache.insert_if_absent("a".into(), result(1));
        cache.insert_if_absent("b".into(), result(2));
        cache.insert_if_absent("c".into(), result(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.counters(), (2, 1));
    }

    #[test]
    fn test_concurrent_inserts_converge() {
        // ---
        let cache = Arc::new(AnalysisCache::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.insert_if_absent("same".into(), result(i)))
            })
            .collect();
        let stored: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(cache.len(), 1);
        let winner = cache.get("same").unwrap();
        assert!(stored.iter().all(|s| s.reading_count == winner.reading_count));
    }
}
