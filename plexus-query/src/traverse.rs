//! Related-node traversal: memo first, adjacency second, cold backend
//! scan last. Results are always permission-filtered on return, so a
//! cached set never leaks endpoints the caller cannot see.

use std::collections::BTreeSet;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use plexus_cache::{CacheFabric, MemoKey};
use plexus_core::auth::AuthContext;
use plexus_core::errors::GraphResult;
use plexus_core::model::{Direction, Node, Relationship};
use plexus_core::traits::GraphBackend;

/// Dereferences an endpoint id to a node, wherever it lives. The engine
/// implements this with its cache-then-backend resolution.
#[async_trait]
pub trait NodeSource: Send + Sync {
    async fn fetch_node(&self, id: &str) -> GraphResult<Option<Node>>;
}

/// The traversal engine. Borrows the backend and fabric; owns nothing.
pub struct TraversalEngine<'a> {
    backend: &'a dyn GraphBackend,
    fabric: &'a CacheFabric,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(backend: &'a dyn GraphBackend, fabric: &'a CacheFabric) -> Self {
        Self { backend, fabric }
    }

    /// Endpoint nodes related to `source` through `rel_type`. An
    /// unspecified direction is the union of both. `skip_cache` forces
    /// the cold path and refreshes the memo from backend truth.
    pub async fn related(
        &self,
        source: &str,
        rel_type: &str,
        direction: Option<Direction>,
        skip_cache: bool,
        auth: &AuthContext,
        nodes: &dyn NodeSource,
    ) -> GraphResult<Vec<Node>> {
        let direction = direction.unwrap_or(Direction::Both);
        let key = MemoKey::new(source, rel_type, direction);
        let started = Instant::now();

        let ids: BTreeSet<String> = if skip_cache {
            self.scan_backend(source, rel_type, direction).await?
        } else if let Some(ids) = self.fabric.memo_get(&key) {
            debug!(source, rel_type, "traversal memo hit");
            ids.into_iter().collect()
        } else if let Some(ids) = self.fabric.neighbors(source, rel_type, direction) {
            debug!(source, rel_type, "adjacency hit, memoizing");
            self.fabric.memo_put(key.clone(), ids.clone());
            ids
        } else {
            self.scan_backend(source, rel_type, direction).await?
        };

        let endpoints = self.resolve_endpoints(&ids, auth, nodes).await?;
        self.fabric
            .stats()
            .record_traversal_micros(&key.label(), started.elapsed().as_micros() as f64);
        Ok(endpoints)
    }

    /// Cold path: list the relationship-type shard tree, apply direction
    /// and source predicates, promote matches into the fabric, and
    /// refresh the memo.
    async fn scan_backend(
        &self,
        source: &str,
        rel_type: &str,
        direction: Direction,
    ) -> GraphResult<BTreeSet<String>> {
        let rels = self.backend.list_relationships_of_type(rel_type).await?;
        debug!(
            source,
            rel_type,
            scanned = rels.len(),
            "traversal cold path scanned backend"
        );
        let mut ids = BTreeSet::new();
        for rel in rels {
            if let Some(endpoint) = endpoint_for(&rel, source, direction) {
                ids.insert(endpoint.to_string());
                self.fabric.cache_relationship(rel);
            }
        }
        self.fabric
            .memo_put(MemoKey::new(source, rel_type, direction), ids.clone());
        Ok(ids)
    }

    async fn resolve_endpoints(
        &self,
        ids: &BTreeSet<String>,
        auth: &AuthContext,
        nodes: &dyn NodeSource,
    ) -> GraphResult<Vec<Node>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            // Dangling edges (deleted endpoints) resolve to nothing and
            // are skipped.
            if let Some(node) = nodes.fetch_node(id).await? {
                if auth.can_access(&node.permissions) {
                    out.push(node);
                }
            }
        }
        Ok(out)
    }
}

/// The endpoint this relationship contributes for `source` under the
/// given direction, if any.
fn endpoint_for<'r>(rel: &'r Relationship, source: &str, direction: Direction) -> Option<&'r str> {
    match direction {
        Direction::Out => (rel.from == source).then_some(rel.to.as_str()),
        Direction::In => (rel.to == source).then_some(rel.from.as_str()),
        Direction::Both => {
            if rel.from == source {
                Some(rel.to.as_str())
            } else if rel.to == source {
                Some(rel.from.as_str())
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_selection_respects_direction() {
        let rel = Relationship::new("a", "b", "KNOWS");
        assert_eq!(endpoint_for(&rel, "a", Direction::Out), Some("b"));
        assert_eq!(endpoint_for(&rel, "a", Direction::In), None);
        assert_eq!(endpoint_for(&rel, "b", Direction::In), Some("a"));
        assert_eq!(endpoint_for(&rel, "b", Direction::Out), None);
        assert_eq!(endpoint_for(&rel, "a", Direction::Both), Some("b"));
        assert_eq!(endpoint_for(&rel, "c", Direction::Both), None);
    }
}
