//! Session-scoped memoization of gateway calls.
//!
//! Every gateway operation is keyed by its full argument tuple. A
//! repeated call returns the same `Arc` without reaching the service.
//! Entries are never evicted; the cache lives as long as its gateway.

use crate::models::{KpaParams, KpaResult, Record, ScoredSentence};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Hit and miss counters of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl std::ops::Add for CacheStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            entries: self.entries + other.entries,
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
        }
    }
}

/// Unbounded memo table from argument keys to shared results.
pub struct MemoCache<K, V> {
    entries: Mutex<HashMap<K, Arc<V>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }
}

impl<K: Hash + Eq, V> MemoCache<K, V> {
    /// Look up a cached result.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let found = entries.get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store a result, keeping the existing entry if the key is already present.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert_with(|| Arc::new(value)).clone()
    }

    /// Return the cached result for `key`, or compute and store it.
    ///
    /// Errors are returned as-is and leave the cache untouched.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, fetch: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(cached) = self.get(&key) {
            return Ok(cached);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = fetch().await?;
        Ok(self.insert(key, value))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache key of a ranking call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RankKey {
    topic: String,
    records: Vec<Record>,
    top_k: usize,
}

impl RankKey {
    pub fn new(topic: &str, records: &[Record], top_k: usize) -> Self {
        Self {
            topic: topic.to_string(),
            records: records.to_vec(),
            top_k,
        }
    }
}

/// Cache key of a key-point analysis call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeypointsKey {
    domain: String,
    ids: Vec<String>,
    texts: Vec<String>,
    mapping_threshold_bits: u64,
    n_top_kps: usize,
}

impl KeypointsKey {
    pub fn new(domain: &str, ids: &[String], texts: &[String], params: &KpaParams) -> Self {
        Self {
            domain: domain.to_string(),
            ids: ids.to_vec(),
            texts: texts.to_vec(),
            mapping_threshold_bits: params.mapping_threshold.to_bits(),
            n_top_kps: params.n_top_kps,
        }
    }
}

/// One memo table per gateway operation.
#[derive(Default)]
pub struct ResultCache {
    pub(crate) ranked: MemoCache<RankKey, Vec<ScoredSentence>>,
    pub(crate) keypoints: MemoCache<KeypointsKey, KpaResult>,
    pub(crate) links: MemoCache<Vec<String>, Vec<BTreeSet<String>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combined counters of all operations.
    pub fn stats(&self) -> CacheStats {
        self.ranked.stats() + self.keypoints.stats() + self.links.stats()
    }
}
