//! Object key composition. The layouts are a compatibility contract:
//! `nodes/<type>/<shard-path>/<id>.json` and
//! `relationships/<type>/<shard-path>/<from>__<to>.json`.

use plexus_core::config::ShardConfig;

use crate::shard::ShardPlacer;

/// Prefix for all node objects.
pub const NODES_PREFIX: &str = "nodes";
/// Prefix for all relationship objects.
pub const RELATIONSHIPS_PREFIX: &str = "relationships";

/// Bundles the placer with the key layout so callers never hand-build keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyLayout {
    placer: ShardPlacer,
}

impl KeyLayout {
    pub fn new(shards: ShardConfig) -> Self {
        Self {
            placer: ShardPlacer::new(shards),
        }
    }

    pub fn placer(&self) -> &ShardPlacer {
        &self.placer
    }

    /// Full object key for a node.
    pub fn node_key(&self, node_type: &str, id: &str) -> String {
        let shard = self.placer.place(id);
        format!("{NODES_PREFIX}/{node_type}/{shard}/{id}.json")
    }

    /// Full object key for a relationship. Directionality is preserved.
    pub fn relationship_key(&self, rel_type: &str, from: &str, to: &str) -> String {
        let shard = self.placer.place_relationship(from, to);
        format!("{RELATIONSHIPS_PREFIX}/{rel_type}/{shard}/{from}__{to}.json")
    }

    /// Prefix covering every node of one type.
    pub fn node_type_prefix(node_type: &str) -> String {
        format!("{NODES_PREFIX}/{node_type}/")
    }

    /// Prefix covering every relationship of one type.
    pub fn relationship_type_prefix(rel_type: &str) -> String {
        format!("{RELATIONSHIPS_PREFIX}/{rel_type}/")
    }
}
