//! # plexus-engine
//!
//! The public engine facade. Validates inputs, gates permissions,
//! assigns ids, enforces optimistic versioning, keeps the cache fabric
//! coherent with backend writes, and wires up the warm cache.

pub mod engine;

pub use engine::GraphEngine;

// The facade's vocabulary, re-exported for embedders.
pub use plexus_core::{
    AuthContext, Direction, GraphBackend, GraphConfig, GraphError, GraphResult, Node, NodeUpdate,
    PropertyMap, Relationship, RelationshipUpdate,
};
pub use plexus_query::{Filter, QueryPage, QuerySpec};
pub use plexus_store::{FsBackend, MemoryObjectClient, ObjectBackend, ObjectClient};
