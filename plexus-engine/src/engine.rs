//! GraphEngine — thin orchestration over the backend, cache fabric,
//! query executor, and traversal engine. Mutations run
//! validate → gate → write → cache; reads go cache-first with backend
//! promotion on miss.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use plexus_cache::{CacheFabric, WarmCache};
use plexus_core::auth::AuthContext;
use plexus_core::config::{GraphConfig, WarmCacheConfig};
use plexus_core::errors::{GraphError, GraphResult};
use plexus_core::model::{Direction, Node, NodeUpdate, PropertyMap, Relationship, RelationshipUpdate};
use plexus_core::traits::GraphBackend;
use plexus_core::validate;
use plexus_query::traverse::{NodeSource, TraversalEngine};
use plexus_query::{cache_candidates, filter::implied_type, run_query, Filter, QueryPage, QuerySpec};
use plexus_store::KeyLayout;

const LOCK: &str = "default auth lock poisoned";

/// The embeddable property-graph engine.
pub struct GraphEngine {
    backend: Arc<dyn GraphBackend>,
    fabric: Arc<CacheFabric>,
    layout: KeyLayout,
    /// id → type shortcut for bare-id reads; the backend stays the truth.
    type_cache: moka::sync::Cache<String, String>,
    default_auth: RwLock<AuthContext>,
    warm_config: Option<WarmCacheConfig>,
    warm_task: Option<tokio::task::JoinHandle<()>>,
}

impl GraphEngine {
    /// Open an engine over a backend. When a warm cache is configured,
    /// hydration runs before the first operation and the persistence task
    /// starts ticking.
    pub async fn open(backend: Arc<dyn GraphBackend>, config: GraphConfig) -> Self {
        let fabric = Arc::new(CacheFabric::new(config.cache.clone()));
        let warm_config = config.cache.warm.clone();
        let mut warm_task = None;
        if let Some(warm_cfg) = warm_config.clone() {
            let warm = WarmCache::new(warm_cfg.clone());
            warm.hydrate(&fabric).await;
            warm_task = Some(WarmCache::new(warm_cfg).spawn_persistence(fabric.clone()));
        }
        info!(
            num_shards = config.shards.num_shards,
            levels = config.shards.levels,
            warm = warm_config.is_some(),
            "graph engine opened"
        );
        Self {
            backend,
            fabric,
            layout: KeyLayout::new(config.shards),
            type_cache: moka::sync::Cache::builder()
                .max_capacity(config.cache.max_size as u64)
                .time_to_live(Duration::from_secs(config.cache.ttl_secs.max(1)))
                .build(),
            default_auth: RwLock::new(AuthContext::admin()),
            warm_config,
            warm_task,
        }
    }

    /// The fabric, for embedders that batch cache mutations or read stats.
    pub fn fabric(&self) -> &CacheFabric {
        &self.fabric
    }

    /// Auth used when a call passes `None`.
    pub fn set_default_auth(&self, auth: AuthContext) {
        *self.default_auth.write().expect(LOCK) = auth;
    }

    fn resolve_auth(&self, auth: Option<&AuthContext>) -> AuthContext {
        match auth {
            Some(auth) => auth.clone(),
            None => self.default_auth.read().expect(LOCK).clone(),
        }
    }

    /// Persist the warm cache immediately, outside the periodic tick.
    pub async fn flush_warm(&self) -> GraphResult<()> {
        match &self.warm_config {
            Some(cfg) => WarmCache::new(cfg.clone()).persist(&self.fabric).await,
            None => Ok(()),
        }
    }

    // --- Nodes ---

    /// Create a node with a fresh uuid-v4 id and version 1.
    pub async fn create_node(
        &self,
        node_type: &str,
        properties: PropertyMap,
        permissions: Vec<String>,
        auth: Option<&AuthContext>,
    ) -> GraphResult<Node> {
        let auth = self.resolve_auth(auth);
        let id = Uuid::new_v4().to_string();
        let node = Node::new(id, node_type, properties, permissions);
        validate::node_for_create(&node)?;
        // Creating requires holding at least one of the declared tokens.
        auth.require_access(&node.permissions, &format!("node:{}", node.id))?;

        let key = self.layout.node_key(&node.node_type, &node.id);
        self.backend.write_node(&key, &node).await?;
        self.fabric.cache_node(node.clone());
        self.type_cache
            .insert(node.id.clone(), node.node_type.clone());
        info!(node_id = %node.id, node_type = %node.node_type, "node created");
        Ok(node)
    }

    /// Fetch a node. Existence is checked before permissions so the
    /// caller gets an accurate diagnostic.
    pub async fn get_node(&self, id: &str, auth: Option<&AuthContext>) -> GraphResult<Node> {
        let auth = self.resolve_auth(auth);
        let node = self
            .resolve_node(id)
            .await?
            .ok_or_else(|| GraphError::NodeNotFound { id: id.to_string() })?;
        auth.require_access(&node.permissions, &format!("node:{id}"))?;
        Ok(node)
    }

    /// Update properties and/or permissions. An `expected_version`
    /// mismatch fails without touching stored state; on success the
    /// version increments by exactly one.
    pub async fn update_node(
        &self,
        id: &str,
        update: NodeUpdate,
        auth: Option<&AuthContext>,
    ) -> GraphResult<Node> {
        let auth = self.resolve_auth(auth);
        validate::node_for_update(&update)?;
        let mut node = self
            .resolve_node(id)
            .await?
            .ok_or_else(|| GraphError::NodeNotFound { id: id.to_string() })?;
        auth.require_access(&node.permissions, &format!("node:{id}"))?;

        if let Some(expected) = update.expected_version {
            if expected != node.version {
                return Err(GraphError::ConcurrentModification {
                    resource: format!("node:{id}"),
                    expected,
                    actual: node.version,
                });
            }
        }

        if let Some(patch) = update.properties {
            for (key, value) in patch {
                node.properties.insert(key, value);
            }
        }
        if let Some(permissions) = update.permissions {
            node.permissions = permissions;
        }
        node.version += 1;

        let key = self.layout.node_key(&node.node_type, &node.id);
        self.backend.write_node(&key, &node).await?;
        self.fabric.cache_node(node.clone());
        debug!(node_id = %id, version = node.version, "node updated");
        Ok(node)
    }

    /// Delete a node's bytes and purge every cache derivation. Does not
    /// cascade to relationships; dangling edges drop out of traversals.
    pub async fn delete_node(&self, id: &str, auth: Option<&AuthContext>) -> GraphResult<()> {
        let auth = self.resolve_auth(auth);
        let node = self
            .resolve_node(id)
            .await?
            .ok_or_else(|| GraphError::NodeNotFound { id: id.to_string() })?;
        auth.require_access(&node.permissions, &format!("node:{id}"))?;

        let key = self.layout.node_key(&node.node_type, &node.id);
        self.backend.remove_node(&key).await?;
        self.fabric.remove_node(id);
        self.type_cache.invalidate(id);
        info!(node_id = %id, "node deleted");
        Ok(())
    }

    /// Type-scoped query with optional property equality filters.
    pub async fn query_nodes(
        &self,
        node_type: &str,
        property_filters: Option<PropertyMap>,
        auth: Option<&AuthContext>,
    ) -> GraphResult<Vec<Node>> {
        let mut filters = vec![Filter::eq("type", serde_json::Value::String(node_type.into()))];
        if let Some(property_filters) = property_filters {
            for (prop, value) in property_filters {
                filters.push(Filter::eq(format!("properties.{prop}"), value));
            }
        }
        let spec = QuerySpec {
            filter: Some(Filter::and(filters)),
            ..QuerySpec::default()
        };
        Ok(self.query_nodes_advanced(spec, auth).await?.nodes)
    }

    /// Full filter/sort/paginate/aggregate query. Candidates come from
    /// the fabric's indexes when they can serve the filter, otherwise
    /// from a backend scan that promotes what it reads.
    pub async fn query_nodes_advanced(
        &self,
        spec: QuerySpec,
        auth: Option<&AuthContext>,
    ) -> GraphResult<QueryPage> {
        let auth = self.resolve_auth(auth);
        let candidates = match cache_candidates(&self.fabric, spec.filter.as_ref()) {
            Some(candidates) => candidates,
            None => self.scan_candidates(spec.filter.as_ref()).await?,
        };
        run_query(candidates, &spec, &auth)
    }

    async fn scan_candidates(&self, filter: Option<&Filter>) -> GraphResult<Vec<Node>> {
        let types = match filter.and_then(implied_type) {
            Some(node_type) => vec![node_type],
            None => self.backend.list_node_types().await?,
        };
        let mut candidates = Vec::new();
        for node_type in types {
            let nodes = self.backend.list_nodes_of_type(&node_type).await?;
            debug!(%node_type, count = nodes.len(), "backend scan gathered candidates");
            for node in nodes {
                self.fabric.cache_node(node.clone());
                self.type_cache
                    .insert(node.id.clone(), node.node_type.clone());
                candidates.push(node);
            }
        }
        Ok(candidates)
    }

    // --- Relationships ---

    /// Create a relationship. Both endpoints must exist and be visible;
    /// an invisible endpoint reports not-found rather than leaking
    /// existence. An existing (from, to, type) triple is a duplicate.
    pub async fn create_relationship(
        &self,
        from: &str,
        to: &str,
        rel_type: &str,
        properties: Option<PropertyMap>,
        permissions: Option<Vec<String>>,
        auth: Option<&AuthContext>,
    ) -> GraphResult<Relationship> {
        let auth = self.resolve_auth(auth);
        let mut rel = Relationship::new(from, to, rel_type);
        rel.properties = properties;
        rel.permissions = permissions;
        validate::relationship(&rel)?;

        self.require_visible_endpoint(from, &auth).await?;
        self.require_visible_endpoint(to, &auth).await?;

        let key = self.layout.relationship_key(rel_type, from, to);
        if self.backend.read_relationship(&key).await?.is_some() {
            return Err(GraphError::DuplicateRelationship {
                from: from.to_string(),
                to: to.to_string(),
                rel_type: rel_type.to_string(),
            });
        }

        self.backend.write_relationship(&key, &rel).await?;
        self.fabric.cache_relationship(rel.clone());
        info!(%from, %to, rel_type, "relationship created");
        Ok(rel)
    }

    /// Update a relationship's properties or permissions, with the same
    /// optimistic version protocol as nodes.
    pub async fn update_relationship(
        &self,
        from: &str,
        to: &str,
        rel_type: &str,
        update: RelationshipUpdate,
        auth: Option<&AuthContext>,
    ) -> GraphResult<Relationship> {
        let auth = self.resolve_auth(auth);
        validate::relationship_for_update(&update)?;
        let mut rel = self
            .resolve_relationship(from, to, rel_type)
            .await?
            .ok_or_else(|| relationship_not_found(from, to, rel_type))?;
        self.require_relationship_access(&rel, &auth)?;

        if let Some(expected) = update.expected_version {
            if expected != rel.version {
                return Err(GraphError::ConcurrentModification {
                    resource: format!("relationship:{from}->{to}"),
                    expected,
                    actual: rel.version,
                });
            }
        }

        if let Some(patch) = update.properties {
            let target = rel.properties.get_or_insert_with(PropertyMap::new);
            for (key, value) in patch {
                target.insert(key, value);
            }
        }
        if let Some(permissions) = update.permissions {
            rel.permissions = Some(permissions);
        }
        rel.version += 1;

        let key = self.layout.relationship_key(rel_type, from, to);
        self.backend.write_relationship(&key, &rel).await?;
        self.fabric.cache_relationship(rel.clone());
        debug!(%from, %to, rel_type, version = rel.version, "relationship updated");
        Ok(rel)
    }

    /// Delete a relationship's bytes and its adjacency entries.
    pub async fn delete_relationship(
        &self,
        from: &str,
        to: &str,
        rel_type: &str,
        auth: Option<&AuthContext>,
    ) -> GraphResult<()> {
        let auth = self.resolve_auth(auth);
        let rel = self
            .resolve_relationship(from, to, rel_type)
            .await?
            .ok_or_else(|| relationship_not_found(from, to, rel_type))?;
        self.require_relationship_access(&rel, &auth)?;

        let key = self.layout.relationship_key(rel_type, from, to);
        self.backend.remove_relationship(&key).await?;
        self.fabric.remove_relationship(from, to, rel_type);
        info!(%from, %to, rel_type, "relationship deleted");
        Ok(())
    }

    /// Traverse to related nodes. A hidden source yields an empty list,
    /// never a denial that would disclose existence.
    pub async fn query_related_nodes(
        &self,
        source: &str,
        rel_type: &str,
        direction: Option<Direction>,
        skip_cache: bool,
        auth: Option<&AuthContext>,
    ) -> GraphResult<Vec<Node>> {
        let auth = self.resolve_auth(auth);
        let source_node = self
            .resolve_node(source)
            .await?
            .ok_or_else(|| GraphError::NodeNotFound {
                id: source.to_string(),
            })?;
        if !auth.can_access(&source_node.permissions) {
            return Ok(Vec::new());
        }
        let traversal = TraversalEngine::new(self.backend.as_ref(), &self.fabric);
        traversal
            .related(source, rel_type, direction, skip_cache, &auth, self)
            .await
    }

    /// Resolve a node's type from its bare id, probing type prefixes and
    /// memoizing the answer.
    pub async fn get_node_type_from_id(&self, id: &str) -> GraphResult<String> {
        if let Some(node_type) = self.type_cache.get(id) {
            return Ok(node_type);
        }
        if let Some(node) = self.fabric.get_node(id) {
            self.type_cache
                .insert(id.to_string(), node.node_type.clone());
            return Ok(node.node_type);
        }
        match self.load_from_backend(id).await? {
            Some(node) => Ok(node.node_type),
            None => Err(GraphError::NodeNotFound { id: id.to_string() }),
        }
    }

    // --- Internals ---

    /// Cache-first node resolution without permission filtering.
    async fn resolve_node(&self, id: &str) -> GraphResult<Option<Node>> {
        if let Some(node) = self.fabric.get_node(id) {
            return Ok(Some(node));
        }
        self.load_from_backend(id).await
    }

    /// Backend resolution by bare id: try the memoized type first, then
    /// probe every known type prefix. Found nodes are promoted.
    async fn load_from_backend(&self, id: &str) -> GraphResult<Option<Node>> {
        if let Some(node_type) = self.type_cache.get(id) {
            let key = self.layout.node_key(&node_type, id);
            if let Some(node) = self.backend.read_node(&key).await? {
                self.fabric.cache_node(node.clone());
                return Ok(Some(node));
            }
            // Stale hint; fall through to a full probe.
            self.type_cache.invalidate(id);
        }
        for node_type in self.backend.list_node_types().await? {
            let key = self.layout.node_key(&node_type, id);
            if let Some(node) = self.backend.read_node(&key).await? {
                self.type_cache.insert(id.to_string(), node_type);
                self.fabric.cache_node(node.clone());
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    async fn resolve_relationship(
        &self,
        from: &str,
        to: &str,
        rel_type: &str,
    ) -> GraphResult<Option<Relationship>> {
        if let Some(rel) = self.fabric.get_relationship(from, to, rel_type) {
            return Ok(Some(rel));
        }
        let key = self.layout.relationship_key(rel_type, from, to);
        match self.backend.read_relationship(&key).await? {
            Some(rel) => {
                self.fabric.cache_relationship(rel.clone());
                Ok(Some(rel))
            }
            None => Ok(None),
        }
    }

    /// Existence-hiding endpoint check: missing and invisible both report
    /// not-found.
    async fn require_visible_endpoint(&self, id: &str, auth: &AuthContext) -> GraphResult<()> {
        match self.resolve_node(id).await? {
            Some(node) if auth.can_access(&node.permissions) => Ok(()),
            _ => Err(GraphError::NodeNotFound { id: id.to_string() }),
        }
    }

    fn require_relationship_access(
        &self,
        rel: &Relationship,
        auth: &AuthContext,
    ) -> GraphResult<()> {
        if auth.can_access_opt(rel.permissions.as_ref()) {
            Ok(())
        } else {
            Err(GraphError::PermissionDenied {
                required: rel.permissions.clone().unwrap_or_default(),
                actual: auth.permissions.clone(),
                resource: format!("relationship:{}->{}", rel.from, rel.to),
            })
        }
    }
}

#[async_trait]
impl NodeSource for GraphEngine {
    async fn fetch_node(&self, id: &str) -> GraphResult<Option<Node>> {
        self.resolve_node(id).await
    }
}

impl Drop for GraphEngine {
    fn drop(&mut self) {
        if let Some(task) = &self.warm_task {
            task.abort();
        }
    }
}

fn relationship_not_found(from: &str, to: &str, rel_type: &str) -> GraphError {
    GraphError::RelationshipNotFound {
        from: from.to_string(),
        to: to.to_string(),
        rel_type: rel_type.to_string(),
    }
}
