//! Deterministic hash → directory path placement.
//!
//! Same inputs always produce the same path, across instances and
//! platforms. Instances sharing a store must agree on the parameters.

use sha2::{Digest, Sha256};

use plexus_core::config::ShardConfig;

/// Maps an id to a relative shard directory path.
#[derive(Debug, Clone, Copy)]
pub struct ShardPlacer {
    num_shards: u32,
    levels: usize,
}

impl ShardPlacer {
    /// A placer with the given parameters. Levels are capped at the digest
    /// width; a zero level count collapses to one.
    pub fn new(config: ShardConfig) -> Self {
        Self {
            num_shards: config.num_shards.max(1),
            levels: config.levels.clamp(1, Sha256::output_size()),
        }
    }

    /// Shard path for an id: SHA-256, first `levels` bytes, each reduced
    /// modulo the shard count and rendered as a zero-padded segment.
    /// Empty strings and arbitrary unicode are accepted.
    pub fn place(&self, id: &str) -> String {
        let digest = Sha256::digest(id.as_bytes());
        let segments: Vec<String> = digest[..self.levels]
            .iter()
            .map(|byte| format!("{:03}", u32::from(*byte) % self.num_shards))
            .collect();
        segments.join("/")
    }

    /// Shard path for a relationship. Hashes `from + "__" + to`, so
    /// reversing the endpoints yields a different path.
    pub fn place_relationship(&self, from: &str, to: &str) -> String {
        self.place(&format!("{from}__{to}"))
    }
}

impl Default for ShardPlacer {
    fn default() -> Self {
        Self::new(ShardConfig::default())
    }
}
