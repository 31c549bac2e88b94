//! Object-store backend. The concrete SDK stays outside the engine: the
//! backend is written against the narrow `ObjectClient` seam, and a
//! deterministic in-memory client backs the tests.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use plexus_core::errors::{GraphError, GraphResult};
use plexus_core::model::{Node, Relationship};
use plexus_core::traits::GraphBackend;

use crate::keys::{KeyLayout, NODES_PREFIX, RELATIONSHIPS_PREFIX};

/// JSON payloads are marked with this content type on the object store.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Minimal surface the backend needs from an S3-compatible SDK.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> GraphResult<()>;
    /// `Ok(None)` for a missing key; transport failures are errors.
    async fn get(&self, key: &str) -> GraphResult<Option<Vec<u8>>>;
    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> GraphResult<bool>;
    /// All keys under a prefix, in lexicographic order.
    async fn list(&self, prefix: &str) -> GraphResult<Vec<String>>;
}

/// Backend persisting each entity as a JSON object behind an `ObjectClient`.
pub struct ObjectBackend {
    client: Arc<dyn ObjectClient>,
}

impl ObjectBackend {
    pub fn new(client: Arc<dyn ObjectClient>) -> Self {
        Self { client }
    }

    async fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) -> GraphResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.client.put(key, bytes, JSON_CONTENT_TYPE).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> GraphResult<Option<T>> {
        match self.client.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Type tags are the path segment right after the top-level prefix.
    async fn list_type_dirs(&self, prefix: &str) -> GraphResult<Vec<String>> {
        let keys = self.client.list(&format!("{prefix}/")).await?;
        let mut types: Vec<String> = Vec::new();
        for key in keys {
            let rest = key.strip_prefix(prefix).and_then(|k| k.strip_prefix('/'));
            if let Some(tag) = rest.and_then(|r| r.split('/').next()) {
                if !tag.is_empty() && types.last().map(String::as_str) != Some(tag) {
                    types.push(tag.to_string());
                }
            }
        }
        types.dedup();
        Ok(types)
    }
}

#[async_trait]
impl GraphBackend for ObjectBackend {
    async fn write_node(&self, key: &str, node: &Node) -> GraphResult<()> {
        self.write_json(key, node).await
    }

    async fn read_node(&self, key: &str) -> GraphResult<Option<Node>> {
        self.read_json(key).await
    }

    async fn remove_node(&self, key: &str) -> GraphResult<bool> {
        self.client.delete(key).await
    }

    async fn write_relationship(&self, key: &str, rel: &Relationship) -> GraphResult<()> {
        self.write_json(key, rel).await
    }

    async fn read_relationship(&self, key: &str) -> GraphResult<Option<Relationship>> {
        self.read_json(key).await
    }

    async fn remove_relationship(&self, key: &str) -> GraphResult<bool> {
        self.client.delete(key).await
    }

    async fn list_node_types(&self) -> GraphResult<Vec<String>> {
        self.list_type_dirs(NODES_PREFIX).await
    }

    async fn list_relationship_types(&self) -> GraphResult<Vec<String>> {
        self.list_type_dirs(RELATIONSHIPS_PREFIX).await
    }

    async fn list_nodes_of_type(&self, node_type: &str) -> GraphResult<Vec<Node>> {
        let keys = self
            .client
            .list(&KeyLayout::node_type_prefix(node_type))
            .await?;
        let mut nodes = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(node) = self.read_json(&key).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    async fn list_relationships_of_type(&self, rel_type: &str) -> GraphResult<Vec<Relationship>> {
        let keys = self
            .client
            .list(&KeyLayout::relationship_type_prefix(rel_type))
            .await?;
        let mut rels = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(rel) = self.read_json(&key).await? {
                rels.push(rel);
            }
        }
        Ok(rels)
    }

    async fn list_keys(&self, prefix: &str) -> GraphResult<Vec<String>> {
        self.client.list(prefix).await
    }
}

/// In-memory object client for tests and examples. Deterministic listing
/// order via `BTreeMap`.
#[derive(Default)]
pub struct MemoryObjectClient {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded for a key, for asserting upload metadata.
    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .expect("object map poisoned")
            .get(key)
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> GraphResult<()> {
        self.objects
            .write()
            .map_err(|e| GraphError::backend("object put", e))?
            .insert(
                key.to_string(),
                StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        Ok(())
    }

    async fn get(&self, key: &str) -> GraphResult<Option<Vec<u8>>> {
        Ok(self
            .objects
            .read()
            .map_err(|e| GraphError::backend("object get", e))?
            .get(key)
            .map(|o| o.bytes.clone()))
    }

    async fn delete(&self, key: &str) -> GraphResult<bool> {
        Ok(self
            .objects
            .write()
            .map_err(|e| GraphError::backend("object delete", e))?
            .remove(key)
            .is_some())
    }

    async fn list(&self, prefix: &str) -> GraphResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .map_err(|e| GraphError::backend("object list", e))?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
