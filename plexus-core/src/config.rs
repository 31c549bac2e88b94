//! Engine configuration. Shard parameters must match across instances
//! sharing a directory or bucket, otherwise lookups probe wrong paths.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub cache: CacheConfig,
    pub shards: ShardConfig,
    /// Present only when the object-store backend is in use.
    pub object_store: Option<ObjectStoreConfig>,
}

/// Cache fabric configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry TTL in seconds, checked lazily on lookup.
    pub ttl_secs: u64,
    /// Soft entry ceiling; overflow evicts the least-recently-inserted.
    pub max_size: usize,
    /// Compound indexes to maintain, per type.
    pub compound_indexes: Vec<CompoundIndexSpec>,
    /// Numeric range indexes to maintain, per type.
    pub range_indexes: Vec<RangeIndexSpec>,
    /// Warm on-disk cache; `None` disables persistence entirely.
    pub warm: Option<WarmCacheConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: constants::DEFAULT_CACHE_TTL_SECS,
            max_size: constants::DEFAULT_CACHE_MAX_SIZE,
            compound_indexes: Vec::new(),
            range_indexes: Vec::new(),
            warm: None,
        }
    }
}

/// A compound index over an ordered property list of one node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundIndexSpec {
    pub node_type: String,
    pub properties: Vec<String>,
}

/// A bucketed range index over one numeric property of one node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeIndexSpec {
    pub node_type: String,
    pub property: String,
}

/// Warm on-disk cache configuration. The directory is owned exclusively by
/// one engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmCacheConfig {
    /// Directory holding the three cache files.
    pub directory: PathBuf,
    /// Seconds between persistence ticks.
    pub persistence_interval_secs: u64,
    /// Files older than this at startup are deleted and ignored.
    pub max_cache_age_secs: u64,
    /// Index-hit count above which a node or memo counts as popular.
    pub popularity_threshold: u64,
}

impl Default for WarmCacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".plexus-cache"),
            persistence_interval_secs: constants::DEFAULT_PERSISTENCE_INTERVAL_SECS,
            max_cache_age_secs: constants::DEFAULT_MAX_CACHE_AGE_SECS,
            popularity_threshold: constants::DEFAULT_POPULARITY_THRESHOLD,
        }
    }
}

/// Deterministic placement parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    /// Shard count per level; segment is `byte % num_shards`.
    pub num_shards: u32,
    /// Number of path levels.
    pub levels: usize,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            num_shards: constants::DEFAULT_NUM_SHARDS,
            levels: constants::DEFAULT_SHARD_LEVELS,
        }
    }
}

/// Connection parameters consumed only by the object-store client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Path-style addressing, required by most S3-compatible servers.
    pub force_path_style: bool,
}
