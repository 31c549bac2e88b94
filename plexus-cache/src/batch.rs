//! Batch mode: while a batch is open, mutating cache operations queue up
//! and commit applies them in order under one write-lock acquisition, so
//! readers never observe a half-applied batch.

use plexus_core::model::{Node, Relationship};

/// A queued cache mutation.
#[derive(Debug, Clone)]
pub enum BatchOp {
    CacheNode(Node),
    CacheRelationship(Relationship),
    RemoveNode(String),
    RemoveRelationship {
        from: String,
        to: String,
        rel_type: String,
    },
    Clear,
}
