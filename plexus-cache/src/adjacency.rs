//! Forward and reverse adjacency, always updated together. These maps are
//! the sole authoritative source for traversal hits.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use plexus_core::model::Direction;

type TypedNeighbors = HashMap<String, BTreeSet<String>>;

/// source → type → targets, plus the symmetric reverse map.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Adjacency {
    out: HashMap<String, TypedNeighbors>,
    incoming: HashMap<String, TypedNeighbors>,
}

impl Adjacency {
    pub fn add(&mut self, from: &str, to: &str, rel_type: &str) {
        self.out
            .entry(from.to_string())
            .or_default()
            .entry(rel_type.to_string())
            .or_default()
            .insert(to.to_string());
        self.incoming
            .entry(to.to_string())
            .or_default()
            .entry(rel_type.to_string())
            .or_default()
            .insert(from.to_string());
    }

    pub fn remove(&mut self, from: &str, to: &str, rel_type: &str) {
        remove_entry(&mut self.out, from, rel_type, to);
        remove_entry(&mut self.incoming, to, rel_type, from);
    }

    /// Remove every edge entry that references `id` as either endpoint.
    pub fn remove_all_for(&mut self, id: &str) {
        if let Some(typed) = self.out.remove(id) {
            for (rel_type, targets) in typed {
                for target in targets {
                    remove_entry(&mut self.incoming, &target, &rel_type, id);
                }
            }
        }
        if let Some(typed) = self.incoming.remove(id) {
            for (rel_type, sources) in typed {
                for source in sources {
                    remove_entry(&mut self.out, &source, &rel_type, id);
                }
            }
        }
    }

    /// Neighbor set for (id, type, direction). `None` means the adjacency
    /// holds nothing for this key and the caller must take the cold path.
    pub fn neighbors(&self, id: &str, rel_type: &str, direction: Direction) -> Option<BTreeSet<String>> {
        let outgoing = self.out.get(id).and_then(|typed| typed.get(rel_type));
        let inbound = self.incoming.get(id).and_then(|typed| typed.get(rel_type));
        match direction {
            Direction::Out => outgoing.cloned(),
            Direction::In => inbound.cloned(),
            Direction::Both => match (outgoing, inbound) {
                (None, None) => None,
                (a, b) => {
                    let mut union = a.cloned().unwrap_or_default();
                    if let Some(b) = b {
                        union.extend(b.iter().cloned());
                    }
                    Some(union)
                }
            },
        }
    }

    pub fn clear(&mut self) {
        self.out.clear();
        self.incoming.clear();
    }
}

fn remove_entry(map: &mut HashMap<String, TypedNeighbors>, id: &str, rel_type: &str, other: &str) {
    if let Some(typed) = map.get_mut(id) {
        if let Some(set) = typed.get_mut(rel_type) {
            set.remove(other);
            if set.is_empty() {
                typed.remove(rel_type);
            }
        }
        if typed.is_empty() {
            map.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_populates_both_directions() {
        let mut adj = Adjacency::default();
        adj.add("alice", "bob", "FOLLOWS");

        let out = adj.neighbors("alice", "FOLLOWS", Direction::Out).unwrap();
        assert!(out.contains("bob"));
        let inbound = adj.neighbors("bob", "FOLLOWS", Direction::In).unwrap();
        assert!(inbound.contains("alice"));
        assert!(adj.neighbors("alice", "FOLLOWS", Direction::In).is_none());
    }

    #[test]
    fn both_unions_directions() {
        let mut adj = Adjacency::default();
        adj.add("a", "b", "KNOWS");
        adj.add("c", "a", "KNOWS");

        let both = adj.neighbors("a", "KNOWS", Direction::Both).unwrap();
        assert_eq!(both.len(), 2);
        assert!(both.contains("b") && both.contains("c"));
    }

    #[test]
    fn remove_cleans_empty_entries() {
        let mut adj = Adjacency::default();
        adj.add("a", "b", "KNOWS");
        adj.remove("a", "b", "KNOWS");

        // Full cleanup: the key disappears entirely, signalling cold path.
        assert!(adj.neighbors("a", "KNOWS", Direction::Out).is_none());
        assert!(adj.neighbors("b", "KNOWS", Direction::In).is_none());
    }

    #[test]
    fn remove_all_scrubs_both_sides() {
        let mut adj = Adjacency::default();
        adj.add("a", "b", "KNOWS");
        adj.add("c", "a", "LIKES");
        adj.remove_all_for("a");

        assert!(adj.neighbors("b", "KNOWS", Direction::In).is_none());
        assert!(adj.neighbors("c", "LIKES", Direction::Out).is_none());
    }
}
