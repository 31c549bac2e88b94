//! Traversal memoization: (source, type, direction) → endpoint ids.
//! TTL-governed; answers repeat traversals without touching adjacency.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plexus_core::model::Direction;

/// Memo key. Rendered as `source|type|direction` for stats and warm files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoKey {
    pub source: String,
    pub rel_type: String,
    pub direction: Direction,
}

impl MemoKey {
    pub fn new(source: impl Into<String>, rel_type: impl Into<String>, direction: Direction) -> Self {
        Self {
            source: source.into(),
            rel_type: rel_type.into(),
            direction,
        }
    }

    pub fn label(&self) -> String {
        format!("{}|{}|{}", self.source, self.rel_type, self.direction.as_str())
    }
}

/// A memoized endpoint set with its creation time. Wall-clock stamped so
/// entries survive warm-cache round trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoEntry {
    pub ids: BTreeSet<String>,
    pub cached_at: DateTime<Utc>,
}

/// The memo table. Lives inside the fabric state lock.
#[derive(Debug, Default)]
pub struct MemoTable {
    entries: HashMap<MemoKey, MemoEntry>,
    ttl_secs: i64,
}

impl MemoTable {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_secs: ttl_secs as i64,
        }
    }

    pub fn get(&self, key: &MemoKey, now: DateTime<Utc>) -> Option<&MemoEntry> {
        self.entries
            .get(key)
            .filter(|entry| (now - entry.cached_at).num_seconds() < self.ttl_secs)
    }

    /// Whether an entry exists but has outlived the TTL.
    pub fn is_expired(&self, key: &MemoKey, now: DateTime<Utc>) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| (now - entry.cached_at).num_seconds() >= self.ttl_secs)
    }

    pub fn put(&mut self, key: MemoKey, ids: BTreeSet<String>, now: DateTime<Utc>) {
        self.entries.insert(key, MemoEntry { ids, cached_at: now });
    }

    pub fn put_entry(&mut self, key: MemoKey, entry: MemoEntry) {
        self.entries.insert(key, entry);
    }

    pub fn remove(&mut self, key: &MemoKey) {
        self.entries.remove(key);
    }

    /// Drop every memo whose source is `id`.
    pub fn remove_source(&mut self, id: &str) {
        self.entries.retain(|key, _| key.source != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemoKey, &MemoEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_entries_hit_until_ttl() {
        let mut table = MemoTable::new(60);
        let key = MemoKey::new("a", "KNOWS", Direction::Out);
        let now = Utc::now();
        table.put(key.clone(), BTreeSet::from(["b".to_string()]), now);

        assert!(table.get(&key, now).is_some());
        let later = now + Duration::seconds(61);
        assert!(table.get(&key, later).is_none());
        assert!(table.is_expired(&key, later));
    }

    #[test]
    fn direction_is_part_of_the_key() {
        let mut table = MemoTable::new(60);
        let now = Utc::now();
        table.put(
            MemoKey::new("a", "KNOWS", Direction::Out),
            BTreeSet::from(["b".to_string()]),
            now,
        );
        assert!(table
            .get(&MemoKey::new("a", "KNOWS", Direction::In), now)
            .is_none());
    }
}
