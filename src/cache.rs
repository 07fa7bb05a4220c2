//! Bounded FIFO memoization of pipeline results.
//!
//! Keys are fixed-precision string encodings of the request parameters, so
//! tuples that round to the same key share one entry. Eviction is strict FIFO
//! on overflow: the oldest inserted key goes first, regardless of how recently
//! it was read. Insertion order is tracked explicitly in a queue of keys.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::pipeline::PipelineResult;

/// Default number of cached results
pub const DEFAULT_CACHE_CAPACITY: usize = 200;

/// Default number of decimal places in a cache key
pub const DEFAULT_KEY_PRECISION: usize = 4;

/// Cache key derived from `(delta_t_norm, t_start, t_end, model_mode)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Encode the request parameters rounded to `precision` decimal places
    pub fn new(
        delta_t_norm: f64,
        t_start: f64,
        t_end: f64,
        model_mode: bool,
        precision: usize,
    ) -> Self {
        Self(format!(
            "{:.p$}_{:.p$}_{:.p$}_{}",
            delta_t_norm,
            t_start,
            t_end,
            model_mode,
            p = precision
        ))
    }

    /// The encoded key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounded FIFO map from [`CacheKey`] to shared [`PipelineResult`]s
#[derive(Debug)]
pub struct PipelineCache {
    entries: HashMap<CacheKey, Arc<PipelineResult>>,
    order: VecDeque<CacheKey>,
    capacity: usize,
    precision: usize,
}

impl Default for PipelineCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_KEY_PRECISION)
    }
}

impl PipelineCache {
    /// Create an empty cache (capacity is at least 1)
    pub fn new(capacity: usize, precision: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            precision,
        }
    }

    /// Build the key for a request using this cache's precision
    pub fn key(&self, delta_t_norm: f64, t_start: f64, t_end: f64, model_mode: bool) -> CacheKey {
        CacheKey::new(delta_t_norm, t_start, t_end, model_mode, self.precision)
    }

    /// Look up a cached result
    pub fn get(&self, key: &CacheKey) -> Option<Arc<PipelineResult>> {
        self.entries.get(key).cloned()
    }

    /// Store a result, evicting the oldest entry when full.
    ///
    /// Returns the evicted key, if any. Re-inserting an existing key replaces
    /// its value and keeps its original position.
    pub fn set(&mut self, key: CacheKey, value: Arc<PipelineResult>) -> Option<CacheKey> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.order.pop_front().map(|oldest| {
                self.entries.remove(&oldest);
                log::debug!("Pipeline cache full, evicted {}", oldest);
                oldest
            })
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    /// True when `key` is cached
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached results
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys in insertion order, oldest first
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.order.iter()
    }

    /// Drop every cached result
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
