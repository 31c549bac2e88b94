//! The storage backend seam. Two interchangeable implementations live in
//! `plexus-store`; the engine only ever sees this trait.

use async_trait::async_trait;

use crate::errors::GraphResult;
use crate::model::{Node, Relationship};

/// Bytes-level persistence keyed by shard path.
///
/// Keys are full relative object keys (`nodes/<type>/<shard>/<id>.json`);
/// callers compute them through the shard placer. Not-found is a
/// distinguished `Ok(None)` / `Ok(false)`, never an error; transport and IO
/// failures propagate unchanged as `GraphError::Backend`.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    async fn write_node(&self, key: &str, node: &Node) -> GraphResult<()>;
    async fn read_node(&self, key: &str) -> GraphResult<Option<Node>>;
    /// Returns whether anything was deleted.
    async fn remove_node(&self, key: &str) -> GraphResult<bool>;

    async fn write_relationship(&self, key: &str, rel: &Relationship) -> GraphResult<()>;
    async fn read_relationship(&self, key: &str) -> GraphResult<Option<Relationship>>;
    async fn remove_relationship(&self, key: &str) -> GraphResult<bool>;

    /// Node type tags present in the store (directories under `nodes/`).
    async fn list_node_types(&self) -> GraphResult<Vec<String>>;
    /// Relationship type tags present in the store.
    async fn list_relationship_types(&self) -> GraphResult<Vec<String>>;

    /// Every node of one type, deserialized.
    async fn list_nodes_of_type(&self, node_type: &str) -> GraphResult<Vec<Node>>;
    /// Every relationship of one type, deserialized.
    async fn list_relationships_of_type(&self, rel_type: &str) -> GraphResult<Vec<Relationship>>;

    /// Object keys under a prefix, relative to the store root.
    async fn list_keys(&self, prefix: &str) -> GraphResult<Vec<String>>;
}
