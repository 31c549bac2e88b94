//! # plexus-query
//!
//! The query executor and traversal engine. Filters, sorts, paginates,
//! and aggregates over candidate nodes, using the cache fabric's derived
//! indexes as optimization hints; traversals answer from memo, then
//! adjacency, then a cold backend scan.

pub mod aggregate;
pub mod executor;
pub mod filter;
pub mod sort;
pub mod traverse;

pub use aggregate::{AggregateOp, Aggregation};
pub use executor::{cache_candidates, run_query, QueryPage, QuerySpec};
pub use filter::{Filter, FilterOp, LogicOp};
pub use sort::{SortDirection, SortSpec};
pub use traverse::{NodeSource, TraversalEngine};
