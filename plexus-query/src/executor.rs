//! Query execution over candidate nodes: structural filter, permission
//! filter, stable sort, aggregation, pagination. Candidate selection may
//! come from the cache fabric's indexes; the full predicate always
//! re-runs because indexes are hints, not truth.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use plexus_cache::CacheFabric;
use plexus_core::auth::AuthContext;
use plexus_core::errors::GraphResult;
use plexus_core::model::Node;
use plexus_core::validate;

use crate::aggregate::{self, Aggregation};
use crate::filter::{implied_property_eq, implied_type, Filter};
use crate::sort::{self, SortSpec};

/// A full query: filter tree, multi-key sort, pagination, aggregations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Absent filter matches everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    /// Positive page size; `None` takes the default, the ceiling applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Zero-based row offset.
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default)]
    pub group_by: Vec<String>,
}

/// One result page plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPage {
    pub nodes: Vec<Node>,
    /// Matched row count before pagination.
    pub total: usize,
    /// Whether rows exist past this page.
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,
}

/// Candidate nodes the fabric can supply for this filter, or `None` when
/// the indexes cannot serve it and the caller must scan the backend.
///
/// Plan: a pinned `type = T` restricts to the type index; a conjunct
/// `properties.X = V` intersects with the property index.
pub fn cache_candidates(fabric: &CacheFabric, filter: Option<&Filter>) -> Option<Vec<Node>> {
    let node_type = filter.and_then(implied_type)?;
    if !fabric.has_type(&node_type) {
        return None;
    }
    let ids = fabric.ids_by_type(&node_type);
    let mut nodes = fabric.nodes_by_type(&node_type);
    if nodes.len() != ids.len() {
        // The index lists ids whose entities are not materialized (warm
        // hydration, TTL expiry). Only the backend can answer completely.
        debug!(
            %node_type,
            indexed = ids.len(),
            materialized = nodes.len(),
            "type index incomplete, falling back to scan"
        );
        return None;
    }
    if let Some((property, value)) = filter.and_then(implied_property_eq) {
        let ids: HashSet<String> = fabric
            .ids_by_property(&node_type, &property, &value)
            .into_iter()
            .collect();
        nodes.retain(|node| ids.contains(&node.id));
        debug!(
            %node_type,
            %property,
            candidates = nodes.len(),
            "property index restricted candidates"
        );
    } else {
        debug!(%node_type, candidates = nodes.len(), "type index supplied candidates");
    }
    Some(nodes)
}

/// Run the pipeline over already-gathered candidates. The permission
/// filter always applies after the structural filter; hidden nodes drop
/// silently.
pub fn run_query(
    candidates: Vec<Node>,
    spec: &QuerySpec,
    auth: &AuthContext,
) -> GraphResult<QueryPage> {
    let limit = validate::query_limit(spec.limit)?;

    let mut matched: Vec<Node> = candidates
        .into_iter()
        .filter(|node| spec.filter.as_ref().map_or(true, |f| f.matches(node)))
        .filter(|node| auth.can_access(&node.permissions))
        .collect();

    sort::sort_nodes(&mut matched, &spec.sort);

    let aggregations = if spec.aggregations.is_empty() {
        None
    } else {
        Some(aggregate::compute(&matched, &spec.aggregations, &spec.group_by))
    };

    let total = matched.len();
    let has_more = spec.offset + limit < total;
    let nodes: Vec<Node> = matched.into_iter().skip(spec.offset).take(limit).collect();

    debug!(total, page = nodes.len(), has_more, "query executed");
    Ok(QueryPage {
        nodes,
        total,
        has_more,
        aggregations,
    })
}
