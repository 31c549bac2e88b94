//! # plexus-core
//!
//! Foundation crate for the Plexus property-graph store.
//! Defines the data model, error taxonomy, config, validation rules,
//! the permission gate, and the storage backend trait.
//! Every other crate in the workspace depends on this.

pub mod auth;
pub mod config;
pub mod constants;
pub mod errors;
pub mod model;
pub mod traits;
pub mod validate;

// Re-export the most commonly used types at the crate root.
pub use auth::AuthContext;
pub use config::{CacheConfig, GraphConfig, ShardConfig, WarmCacheConfig};
pub use errors::{GraphError, GraphResult};
pub use model::{Direction, Node, NodeUpdate, PropertyMap, Relationship, RelationshipUpdate};
pub use traits::GraphBackend;
