//! Hit/miss counters, per-index access counters, and a running mean of
//! traversal response times. Updated lock-free on read paths.

use std::collections::HashMap;

use dashmap::DashMap;

/// Smoothing factor for the traversal response-time mean. Each sample
/// contributes a fifth of the new value.
const RESPONSE_TIME_ALPHA: f64 = 0.2;

/// Fabric-wide counters. Lives beside the state lock; every method is
/// callable from concurrent readers.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: DashMap<String, u64>,
    misses: DashMap<String, u64>,
    /// Index-hit counter per node id — the warm-cache popularity signal.
    node_access: DashMap<String, u64>,
    /// Exponential running mean of traversal response times (micros).
    traversal_micros: DashMap<String, f64>,
    /// Per-index access counters, keyed by axis name.
    index_access: DashMap<&'static str, u64>,
}

impl CacheStats {
    pub fn record_hit(&self, key: &str) {
        *self.hits.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn record_miss(&self, key: &str) {
        *self.misses.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn hit_count(&self, key: &str) -> u64 {
        self.hits.get(key).map(|c| *c).unwrap_or(0)
    }

    pub fn miss_count(&self, key: &str) -> u64 {
        self.misses.get(key).map(|c| *c).unwrap_or(0)
    }

    pub fn bump_node_access(&self, id: &str) {
        *self.node_access.entry(id.to_string()).or_insert(0) += 1;
    }

    pub fn node_access_count(&self, id: &str) -> u64 {
        self.node_access.get(id).map(|c| *c).unwrap_or(0)
    }

    /// Node ids whose access counter exceeds `threshold`.
    pub fn popular_nodes(&self, threshold: u64) -> Vec<String> {
        self.node_access
            .iter()
            .filter(|entry| *entry.value() > threshold)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Export the access counters so a warm-cache restart can re-anchor
    /// the popularity signal.
    pub fn export_node_access(&self) -> HashMap<String, u64> {
        self.node_access
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn import_node_access(&self, counters: HashMap<String, u64>) {
        for (id, count) in counters {
            *self.node_access.entry(id).or_insert(0) += count;
        }
    }

    pub fn record_traversal_micros(&self, key: &str, micros: f64) {
        match self.traversal_micros.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let mean = occupied.get_mut();
                *mean = *mean * (1.0 - RESPONSE_TIME_ALPHA) + micros * RESPONSE_TIME_ALPHA;
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(micros);
            }
        }
    }

    pub fn traversal_mean_micros(&self, key: &str) -> Option<f64> {
        self.traversal_micros.get(key).map(|m| *m)
    }

    pub fn bump_index(&self, axis: &'static str) {
        *self.index_access.entry(axis).or_insert(0) += 1;
    }

    pub fn index_access_count(&self, axis: &'static str) -> u64 {
        self.index_access.get(axis).map(|c| *c).unwrap_or(0)
    }

    pub fn clear(&self) {
        self.hits.clear();
        self.misses.clear();
        self.node_access.clear();
        self.traversal_micros.clear();
        self.index_access.clear();
    }
}
