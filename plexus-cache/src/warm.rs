//! Warm on-disk cache: periodic serialization of indexes, popular nodes,
//! and popular traversal memos, re-hydrated on startup.
//!
//! The warm cache is a hint. A cold start with the directory absent is
//! correct, only slower; hydrated data is never authoritative for
//! mutation — the backend wins on the next cold access.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use plexus_core::config::WarmCacheConfig;
use plexus_core::errors::{GraphError, GraphResult};
use plexus_core::model::Node;

use crate::adjacency::Adjacency;
use crate::fabric::CacheFabric;
use crate::index::IndexSet;
use crate::memo::{MemoEntry, MemoKey};

pub const INDEXES_FILE: &str = "indexes.cache.json";
pub const NODES_FILE: &str = "nodes.cache.json";
pub const TRAVERSAL_FILE: &str = "traversal.cache.json";

#[derive(Serialize, Deserialize)]
struct IndexesFile {
    timestamp: DateTime<Utc>,
    indexes: IndexSet,
    adjacency: Adjacency,
    /// Access counters, restored to re-anchor the popularity signal.
    node_access: HashMap<String, u64>,
}

#[derive(Serialize, Deserialize)]
struct NodesFile {
    timestamp: DateTime<Utc>,
    nodes: Vec<Node>,
}

#[derive(Serialize, Deserialize)]
struct MemoRecord {
    key: MemoKey,
    entry: MemoEntry,
}

#[derive(Serialize, Deserialize)]
struct TraversalFile {
    timestamp: DateTime<Utc>,
    memos: Vec<MemoRecord>,
}

/// Drives persistence and hydration for one warm-cache directory. The
/// directory is owned by exactly one engine instance.
pub struct WarmCache {
    config: WarmCacheConfig,
}

impl WarmCache {
    pub fn new(config: WarmCacheConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WarmCacheConfig {
        &self.config
    }

    fn path(&self, file: &str) -> PathBuf {
        self.config.directory.join(file)
    }

    /// Serialize the three cache files. Runs on every persistence tick.
    pub async fn persist(&self, fabric: &CacheFabric) -> GraphResult<()> {
        fs::create_dir_all(&self.config.directory)
            .await
            .map_err(|e| GraphError::backend("warm create_dir", e))?;
        let timestamp = Utc::now();
        let threshold = self.config.popularity_threshold;

        let (indexes, adjacency) = fabric.export_indexes();
        let indexes_file = IndexesFile {
            timestamp,
            indexes,
            adjacency,
            node_access: fabric.stats().export_node_access(),
        };
        self.write_file(INDEXES_FILE, &indexes_file).await?;

        let nodes = fabric.export_popular_nodes(threshold);
        let node_count = nodes.len();
        self.write_file(NODES_FILE, &NodesFile { timestamp, nodes })
            .await?;

        let memos: Vec<MemoRecord> = fabric
            .export_popular_memos(threshold)
            .into_iter()
            .map(|(key, entry)| MemoRecord { key, entry })
            .collect();
        let memo_count = memos.len();
        self.write_file(TRAVERSAL_FILE, &TraversalFile { timestamp, memos })
            .await?;

        debug!(
            nodes = node_count,
            memos = memo_count,
            "warm cache persisted"
        );
        Ok(())
    }

    async fn write_file<T: Serialize>(&self, name: &str, payload: &T) -> GraphResult<()> {
        let bytes = serde_json::to_vec(payload)?;
        fs::write(self.path(name), bytes)
            .await
            .map_err(|e| GraphError::backend("warm write", e))
    }

    /// Re-hydrate the fabric from the warm directory. Files older than the
    /// configured maximum age are deleted and ignored; any failure is
    /// logged and skipped — the cache simply starts colder.
    pub async fn hydrate(&self, fabric: &CacheFabric) {
        if let Some(file) = self.load::<IndexesFile>(INDEXES_FILE).await {
            fabric.hydrate_indexes(file.indexes, file.adjacency);
            fabric.stats().import_node_access(file.node_access);
            info!("warm cache: indexes hydrated");
        }
        if let Some(file) = self.load::<NodesFile>(NODES_FILE).await {
            let count = file.nodes.len();
            fabric.hydrate_nodes(file.nodes);
            info!(nodes = count, "warm cache: popular nodes hydrated");
        }
        if let Some(file) = self.load::<TraversalFile>(TRAVERSAL_FILE).await {
            let count = file.memos.len();
            fabric.hydrate_memos(
                file.memos
                    .into_iter()
                    .map(|record| (record.key, record.entry))
                    .collect(),
            );
            info!(memos = count, "warm cache: traversal memos hydrated");
        }
    }

    /// Load one cache file, enforcing the age limit via its embedded
    /// timestamp.
    async fn load<T>(&self, name: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned + Timestamped,
    {
        let path = self.path(name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(file = name, error = %e, "warm cache read failed, ignoring");
                return None;
            }
        };
        let parsed: T = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(file = name, error = %e, "warm cache parse failed, ignoring");
                return None;
            }
        };
        let age = Utc::now() - parsed.timestamp();
        if age.num_seconds() >= self.config.max_cache_age_secs as i64 {
            warn!(file = name, age_secs = age.num_seconds(), "warm cache file stale, deleting");
            if let Err(e) = fs::remove_file(&path).await {
                warn!(file = name, error = %e, "stale warm cache delete failed");
            }
            return None;
        }
        Some(parsed)
    }

    /// Start the periodic persistence task. The handle aborts with the
    /// engine; a failed tick is logged and the loop keeps going.
    pub fn spawn_persistence(self, fabric: Arc<CacheFabric>) -> tokio::task::JoinHandle<()> {
        let interval = Duration::from_secs(self.config.persistence_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh engine
            // does not persist an empty cache over a previous run's files.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.persist(&fabric).await {
                    warn!(error = %e, "warm cache persistence tick failed");
                }
            }
        })
    }
}

trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for IndexesFile {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for NodesFile {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for TraversalFile {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
