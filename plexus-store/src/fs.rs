//! Filesystem backend. Keys map directly to paths under a root directory;
//! shard directories are created on demand.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use plexus_core::errors::{GraphError, GraphResult};
use plexus_core::model::{Node, Relationship};
use plexus_core::traits::GraphBackend;

use crate::keys::{KeyLayout, NODES_PREFIX, RELATIONSHIPS_PREFIX};

/// Backend persisting each entity as a JSON file under a root directory.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// A backend rooted at `root`. The directory is created lazily on the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) -> GraphResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GraphError::backend("fs create_dir", e))?;
        }
        let bytes = serde_json::to_vec(value)?;
        fs::write(&path, bytes)
            .await
            .map_err(|e| GraphError::backend("fs write", e))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> GraphResult<Option<T>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GraphError::backend("fs read", e)),
        }
    }

    async fn remove(&self, key: &str) -> GraphResult<bool> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GraphError::backend("fs remove", e)),
        }
    }

    /// Directory names directly under `prefix`, or empty when the prefix
    /// does not exist yet.
    async fn list_dirs(&self, prefix: &str) -> GraphResult<Vec<String>> {
        let path = self.path_for(prefix);
        let mut entries = match fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GraphError::backend("fs read_dir", e)),
        };
        let mut dirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GraphError::backend("fs read_dir", e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| GraphError::backend("fs read_dir", e))?;
            if file_type.is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Every `.json` file under `prefix`, as keys relative to the root.
    /// Iterative walk — shard trees are shallow but the depth is config-
    /// dependent, so no fixed level count is assumed.
    async fn walk_json_keys(&self, prefix: &str) -> GraphResult<Vec<String>> {
        let mut stack = vec![self.path_for(prefix)];
        let mut keys = Vec::new();
        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(GraphError::backend("fs read_dir", e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| GraphError::backend("fs read_dir", e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| GraphError::backend("fs read_dir", e))?;
                if file_type.is_dir() {
                    stack.push(path);
                } else if path.extension().is_some_and(|ext| ext == "json") {
                    if let Ok(rel) = path.strip_prefix(&self.root) {
                        keys.push(rel.to_string_lossy().replace('\\', "/"));
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl GraphBackend for FsBackend {
    async fn write_node(&self, key: &str, node: &Node) -> GraphResult<()> {
        self.write_json(key, node).await
    }

    async fn read_node(&self, key: &str) -> GraphResult<Option<Node>> {
        self.read_json(key).await
    }

    async fn remove_node(&self, key: &str) -> GraphResult<bool> {
        self.remove(key).await
    }

    async fn write_relationship(&self, key: &str, rel: &Relationship) -> GraphResult<()> {
        self.write_json(key, rel).await
    }

    async fn read_relationship(&self, key: &str) -> GraphResult<Option<Relationship>> {
        self.read_json(key).await
    }

    async fn remove_relationship(&self, key: &str) -> GraphResult<bool> {
        self.remove(key).await
    }

    async fn list_node_types(&self) -> GraphResult<Vec<String>> {
        self.list_dirs(NODES_PREFIX).await
    }

    async fn list_relationship_types(&self) -> GraphResult<Vec<String>> {
        self.list_dirs(RELATIONSHIPS_PREFIX).await
    }

    async fn list_nodes_of_type(&self, node_type: &str) -> GraphResult<Vec<Node>> {
        let keys = self
            .walk_json_keys(&KeyLayout::node_type_prefix(node_type))
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
            .walk_json_keys(&KeyLayout::relationship_type_prefix(rel_type))
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
        self.walk_json_keys(prefix).await
    }
}
