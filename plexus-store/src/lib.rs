//! # plexus-store
//!
//! The sharded, content-addressed object layout and its two backends.
//! The same key layout works on a local filesystem and on an
//! S3-compatible object store.

pub mod fs;
pub mod keys;
pub mod object;
pub mod shard;

pub use fs::FsBackend;
pub use keys::KeyLayout;
pub use object::{MemoryObjectClient, ObjectBackend, ObjectClient};
pub use shard::ShardPlacer;
