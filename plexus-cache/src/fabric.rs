//! The cache fabric. One lock owns every derived structure, so a node or
//! relationship mutation updates the caches, indexes, and adjacency maps
//! atomically with respect to concurrent readers.

use std::collections::BTreeSet;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use plexus_core::config::CacheConfig;
use plexus_core::model::{Direction, Node, Relationship};

use crate::adjacency::Adjacency;
use crate::batch::BatchOp;
use crate::entry::{Peek, TtlFifoStore};
use crate::index::IndexSet;
use crate::memo::{MemoEntry, MemoKey, MemoTable};
use crate::stats::CacheStats;

const LOCK: &str = "cache fabric lock poisoned";

struct FabricState {
    nodes: TtlFifoStore<Node>,
    relationships: TtlFifoStore<Relationship>,
    indexes: IndexSet,
    adjacency: Adjacency,
    memos: MemoTable,
    /// `Some` while a batch is open; queued ops apply on commit.
    batch: Option<Vec<BatchOp>>,
}

/// The in-memory cache manager.
pub struct CacheFabric {
    state: RwLock<FabricState>,
    stats: CacheStats,
    config: CacheConfig,
}

impl CacheFabric {
    pub fn new(config: CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_secs);
        Self {
            state: RwLock::new(FabricState {
                nodes: TtlFifoStore::new(config.max_size, ttl),
                relationships: TtlFifoStore::new(config.max_size, ttl),
                indexes: IndexSet::default(),
                adjacency: Adjacency::default(),
                memos: MemoTable::new(config.ttl_secs),
                batch: None,
            }),
            stats: CacheStats::default(),
            config,
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // --- Node cache ---

    pub fn cache_node(&self, node: Node) {
        let mut state = self.state.write().expect(LOCK);
        if let Some(queue) = state.batch.as_mut() {
            queue.push(BatchOp::CacheNode(node));
            return;
        }
        self.apply_cache_node(&mut state, node);
    }

    pub fn get_node(&self, id: &str) -> Option<Node> {
        let now = Instant::now();
        let stat_key = format!("node:{id}");
        {
            let state = self.state.read().expect(LOCK);
            match state.nodes.peek(id, now) {
                Peek::Fresh(node) => {
                    self.stats.record_hit(&stat_key);
                    self.stats.bump_node_access(id);
                    return Some(node.clone());
                }
                Peek::Missing => {
                    self.stats.record_miss(&stat_key);
                    return None;
                }
                Peek::Expired => {}
            }
        }
        // Lazy TTL purge: the expired entry and its index derivations go
        // together.
        let mut state = self.state.write().expect(LOCK);
        if matches!(state.nodes.peek(id, now), Peek::Expired) {
            if let Some(node) = state.nodes.remove(id) {
                state.indexes.unindex_node(&node);
            }
        }
        self.stats.record_miss(&stat_key);
        None
    }

    pub fn remove_node(&self, id: &str) {
        let mut state = self.state.write().expect(LOCK);
        if let Some(queue) = state.batch.as_mut() {
            queue.push(BatchOp::RemoveNode(id.to_string()));
            return;
        }
        self.apply_remove_node(&mut state, id);
    }

    // --- Relationship cache ---

    pub fn cache_relationship(&self, rel: Relationship) {
        let mut state = self.state.write().expect(LOCK);
        if let Some(queue) = state.batch.as_mut() {
            queue.push(BatchOp::CacheRelationship(rel));
            return;
        }
        self.apply_cache_relationship(&mut state, rel);
    }

    pub fn get_relationship(&self, from: &str, to: &str, rel_type: &str) -> Option<Relationship> {
        let now = Instant::now();
        let triple = format!("{from}|{to}|{rel_type}");
        let stat_key = format!("rel:{triple}");
        {
            let state = self.state.read().expect(LOCK);
            match state.relationships.peek(&triple, now) {
                Peek::Fresh(rel) => {
                    self.stats.record_hit(&stat_key);
                    return Some(rel.clone());
                }
                Peek::Missing => {
                    self.stats.record_miss(&stat_key);
                    return None;
                }
                Peek::Expired => {}
            }
        }
        let mut state = self.state.write().expect(LOCK);
        if matches!(state.relationships.peek(&triple, now), Peek::Expired) {
            if let Some(rel) = state.relationships.remove(&triple) {
                state.adjacency.remove(&rel.from, &rel.to, &rel.rel_type);
                state.indexes.unindex_relationship(&rel.rel_type, &triple);
            }
        }
        self.stats.record_miss(&stat_key);
        None
    }

    pub fn remove_relationship(&self, from: &str, to: &str, rel_type: &str) {
        let mut state = self.state.write().expect(LOCK);
        if let Some(queue) = state.batch.as_mut() {
            queue.push(BatchOp::RemoveRelationship {
                from: from.to_string(),
                to: to.to_string(),
                rel_type: rel_type.to_string(),
            });
            return;
        }
        self.apply_remove_relationship(&mut state, from, to, rel_type);
    }

    pub fn clear(&self) {
        let mut state = self.state.write().expect(LOCK);
        if let Some(queue) = state.batch.as_mut() {
            queue.push(BatchOp::Clear);
            return;
        }
        self.apply_clear(&mut state);
    }

    // --- Index queries ---

    /// Whether the type index holds anything for this type.
    pub fn has_type(&self, node_type: &str) -> bool {
        self.state.read().expect(LOCK).indexes.has_type(node_type)
    }

    pub fn ids_by_type(&self, node_type: &str) -> Vec<String> {
        self.stats.bump_index("type");
        let state = self.state.read().expect(LOCK);
        let ids = state.indexes.ids_by_type(node_type);
        for id in &ids {
            self.stats.bump_node_access(id);
        }
        ids
    }

    /// Cached nodes of a type, fresh entries only.
    pub fn nodes_by_type(&self, node_type: &str) -> Vec<Node> {
        self.stats.bump_index("type");
        let now = Instant::now();
        let state = self.state.read().expect(LOCK);
        state
            .indexes
            .ids_by_type(node_type)
            .iter()
            .filter_map(|id| match state.nodes.peek(id, now) {
                Peek::Fresh(node) => {
                    self.stats.bump_node_access(id);
                    Some(node.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn ids_by_property(&self, node_type: &str, property: &str, value: &Value) -> Vec<String> {
        self.stats.bump_index("property");
        let state = self.state.read().expect(LOCK);
        let ids = state.indexes.ids_by_property(node_type, property, value);
        for id in &ids {
            self.stats.bump_node_access(id);
        }
        ids
    }

    pub fn ids_by_compound(
        &self,
        node_type: &str,
        properties: &[String],
        values: &[Value],
    ) -> Vec<String> {
        self.stats.bump_index("compound");
        let state = self.state.read().expect(LOCK);
        state.indexes.ids_by_compound(node_type, properties, values)
    }

    pub fn ids_by_range(&self, node_type: &str, property: &str, min: f64, max: f64) -> Vec<String> {
        self.stats.bump_index("range");
        let state = self.state.read().expect(LOCK);
        state.indexes.ids_by_range(node_type, property, min, max)
    }

    pub fn ids_by_prefix(&self, node_type: &str, property: &str, prefix: &str) -> Vec<String> {
        self.stats.bump_index("prefix");
        let state = self.state.read().expect(LOCK);
        state.indexes.ids_by_prefix(node_type, property, prefix)
    }

    pub fn relationship_keys_by_type(&self, rel_type: &str) -> Vec<String> {
        self.stats.bump_index("rel_type");
        let state = self.state.read().expect(LOCK);
        state.indexes.relationship_keys_by_type(rel_type)
    }

    // --- Adjacency & traversal memo ---

    /// Adjacency lookup. `None` signals the cold path.
    pub fn neighbors(
        &self,
        id: &str,
        rel_type: &str,
        direction: Direction,
    ) -> Option<BTreeSet<String>> {
        let state = self.state.read().expect(LOCK);
        state.adjacency.neighbors(id, rel_type, direction)
    }

    pub fn memo_get(&self, key: &MemoKey) -> Option<Vec<String>> {
        let now = Utc::now();
        let label = key.label();
        {
            let state = self.state.read().expect(LOCK);
            if let Some(entry) = state.memos.get(key, now) {
                self.stats.record_hit(&label);
                return Some(entry.ids.iter().cloned().collect());
            }
            if !state.memos.is_expired(key, now) {
                self.stats.record_miss(&label);
                return None;
            }
        }
        // Expired: purge lazily and report a miss.
        let mut state = self.state.write().expect(LOCK);
        if state.memos.is_expired(key, now) {
            state.memos.remove(key);
        }
        self.stats.record_miss(&label);
        None
    }

    pub fn memo_put(&self, key: MemoKey, ids: BTreeSet<String>) {
        let mut state = self.state.write().expect(LOCK);
        state.memos.put(key, ids, Utc::now());
    }

    // --- Batch mode ---

    /// Open a batch. Returns false when one is already open.
    pub fn begin_batch(&self) -> bool {
        let mut state = self.state.write().expect(LOCK);
        if state.batch.is_some() {
            return false;
        }
        state.batch = Some(Vec::new());
        true
    }

    /// Apply every queued op in order under one write-lock acquisition.
    /// Returns the number of applied ops, or `None` when no batch is open.
    pub fn commit_batch(&self) -> Option<usize> {
        let mut state = self.state.write().expect(LOCK);
        let ops = state.batch.take()?;
        let count = ops.len();
        for op in ops {
            match op {
                BatchOp::CacheNode(node) => self.apply_cache_node(&mut state, node),
                BatchOp::CacheRelationship(rel) => self.apply_cache_relationship(&mut state, rel),
                BatchOp::RemoveNode(id) => self.apply_remove_node(&mut state, &id),
                BatchOp::RemoveRelationship { from, to, rel_type } => {
                    self.apply_remove_relationship(&mut state, &from, &to, &rel_type)
                }
                BatchOp::Clear => self.apply_clear(&mut state),
            }
        }
        debug!(ops = count, "batch committed");
        Some(count)
    }

    /// Drop a batch without applying it.
    pub fn abort_batch(&self) -> bool {
        let mut state = self.state.write().expect(LOCK);
        state.batch.take().is_some()
    }

    // --- Introspection (tests, warm cache) ---

    pub fn node_count(&self) -> usize {
        self.state.read().expect(LOCK).nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.state.read().expect(LOCK).relationships.len()
    }

    pub fn memo_count(&self) -> usize {
        self.state.read().expect(LOCK).memos.len()
    }

    pub(crate) fn export_indexes(&self) -> (IndexSet, Adjacency) {
        let state = self.state.read().expect(LOCK);
        (state.indexes.clone(), state.adjacency.clone())
    }

    /// Fresh cached nodes whose access counter exceeds the threshold.
    pub(crate) fn export_popular_nodes(&self, threshold: u64) -> Vec<Node> {
        let now = Instant::now();
        let state = self.state.read().expect(LOCK);
        state
            .nodes
            .fresh_values(now)
            .filter(|node| self.stats.node_access_count(&node.id) > threshold)
            .cloned()
            .collect()
    }

    /// Memos whose hit counter exceeds the threshold.
    pub(crate) fn export_popular_memos(&self, threshold: u64) -> Vec<(MemoKey, MemoEntry)> {
        let state = self.state.read().expect(LOCK);
        state
            .memos
            .iter()
            .filter(|(key, _)| self.stats.hit_count(&key.label()) > threshold)
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    pub(crate) fn hydrate_indexes(&self, indexes: IndexSet, adjacency: Adjacency) {
        let mut state = self.state.write().expect(LOCK);
        state.indexes = indexes;
        state.adjacency = adjacency;
    }

    pub(crate) fn hydrate_nodes(&self, nodes: Vec<Node>) {
        let mut state = self.state.write().expect(LOCK);
        for node in nodes {
            self.apply_cache_node(&mut state, node);
        }
    }

    pub(crate) fn hydrate_memos(&self, memos: Vec<(MemoKey, MemoEntry)>) {
        let mut state = self.state.write().expect(LOCK);
        for (key, entry) in memos {
            state.memos.put_entry(key, entry);
        }
    }

    // --- Mutation internals; always called under the write lock ---

    fn apply_cache_node(&self, state: &mut FabricState, node: Node) {
        if let Some(old) = state.nodes.current(&node.id) {
            let old = old.clone();
            state.indexes.unindex_node(&old);
        }
        let evicted = state
            .nodes
            .insert(node.id.clone(), node.clone(), Instant::now());
        for evicted_node in evicted {
            state.indexes.unindex_node(&evicted_node);
        }
        state.indexes.index_node(
            &node,
            &self.config.compound_indexes,
            &self.config.range_indexes,
        );
    }

    fn apply_remove_node(&self, state: &mut FabricState, id: &str) {
        if let Some(node) = state.nodes.remove(id) {
            state.indexes.unindex_node(&node);
        } else {
            // Index entries can outlive the entity (warm hydration); scrub.
            state.indexes.scrub_id_everywhere(id);
        }
        state.adjacency.remove_all_for(id);
        state.memos.remove_source(id);
    }

    fn apply_cache_relationship(&self, state: &mut FabricState, rel: Relationship) {
        let triple = rel.triple_key();
        let evicted = state
            .relationships
            .insert(triple.clone(), rel.clone(), Instant::now());
        for evicted_rel in evicted {
            state
                .adjacency
                .remove(&evicted_rel.from, &evicted_rel.to, &evicted_rel.rel_type);
            state
                .indexes
                .unindex_relationship(&evicted_rel.rel_type, &evicted_rel.triple_key());
        }
        state.adjacency.add(&rel.from, &rel.to, &rel.rel_type);
        state.indexes.index_relationship(&rel.rel_type, &triple);
    }

    fn apply_remove_relationship(
        &self,
        state: &mut FabricState,
        from: &str,
        to: &str,
        rel_type: &str,
    ) {
        let triple = format!("{from}|{to}|{rel_type}");
        state.relationships.remove(&triple);
        state.adjacency.remove(from, to, rel_type);
        state.indexes.unindex_relationship(rel_type, &triple);
    }

    fn apply_clear(&self, state: &mut FabricState) {
        state.nodes.clear();
        state.relationships.clear();
        state.indexes.clear();
        state.adjacency.clear();
        state.memos.clear();
        self.stats.clear();
    }
}
