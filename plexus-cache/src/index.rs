//! Derived node indexes: type, property, compound, range, and prefix,
//! plus the relationship-type index. Entries are optimization hints —
//! query evaluation always re-runs the full predicate.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use plexus_core::config::{CompoundIndexSpec, RangeIndexSpec};
use plexus_core::constants::DEFAULT_RANGE_BUCKET_WIDTH;
use plexus_core::model::Node;

fn axis_key(node_type: &str, property: &str) -> String {
    format!("{node_type}|{property}")
}

fn compound_key(node_type: &str, properties: &[String]) -> String {
    format!("{node_type}|{}", properties.join("+"))
}

/// One non-overlapping bucket of a numeric range index. Half-open: an id
/// lands here when `min <= value < max`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeBucket {
    pub min: f64,
    pub max: f64,
    pub ids: BTreeSet<String>,
}

/// All derived index maps. Serializable as a unit for the warm cache.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IndexSet {
    /// type → node ids.
    by_type: HashMap<String, BTreeSet<String>>,
    /// type|property → value-as-json → node ids.
    by_property: HashMap<String, HashMap<String, BTreeSet<String>>>,
    /// type|p1+p2+… → json array of values → node ids.
    by_compound: HashMap<String, HashMap<String, BTreeSet<String>>>,
    /// type|property → ordered non-overlapping buckets.
    by_range: HashMap<String, Vec<RangeBucket>>,
    /// type|property → prefix → node ids.
    by_prefix: HashMap<String, HashMap<String, BTreeSet<String>>>,
    /// relationship type → triple keys.
    rel_by_type: HashMap<String, BTreeSet<String>>,
}

impl IndexSet {
    /// Index a node across every configured axis.
    pub fn index_node(
        &mut self,
        node: &Node,
        compound_specs: &[CompoundIndexSpec],
        range_specs: &[RangeIndexSpec],
    ) {
        self.by_type
            .entry(node.node_type.clone())
            .or_default()
            .insert(node.id.clone());

        for (prop, value) in &node.properties {
            let axis = axis_key(&node.node_type, prop);
            let value_key = value.to_string();
            self.by_property
                .entry(axis.clone())
                .or_default()
                .entry(value_key)
                .or_default()
                .insert(node.id.clone());

            // Prefix index is always on for string properties.
            if let Value::String(s) = value {
                let prefixes = self.by_prefix.entry(axis).or_default();
                let mut prefix = String::new();
                for ch in s.chars() {
                    prefix.push(ch);
                    prefixes
                        .entry(prefix.clone())
                        .or_default()
                        .insert(node.id.clone());
                }
            }
        }

        for spec in compound_specs {
            if spec.node_type != node.node_type {
                continue;
            }
            // Only index when every listed property is present.
            let values: Option<Vec<Value>> = spec
                .properties
                .iter()
                .map(|p| node.properties.get(p).cloned())
                .collect();
            if let Some(values) = values {
                let key = Value::Array(values).to_string();
                self.by_compound
                    .entry(compound_key(&spec.node_type, &spec.properties))
                    .or_default()
                    .entry(key)
                    .or_default()
                    .insert(node.id.clone());
            }
        }

        for spec in range_specs {
            if spec.node_type != node.node_type {
                continue;
            }
            if let Some(value) = node.properties.get(&spec.property).and_then(Value::as_f64) {
                let buckets = self
                    .by_range
                    .entry(axis_key(&spec.node_type, &spec.property))
                    .or_default();
                insert_into_buckets(buckets, value, &node.id);
            }
        }
    }

    /// Remove a node's entries using its cached copy for precise lookups.
    pub fn unindex_node(&mut self, node: &Node) {
        self.scrub_id(&node.node_type, &node.id);
    }

    /// Remove an id from every index of one type. Used both for precise
    /// unindexing and for ids hydrated without a cached node.
    pub fn scrub_id(&mut self, node_type: &str, id: &str) {
        if let Some(ids) = self.by_type.get_mut(node_type) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_type.remove(node_type);
            }
        }
        let type_prefix = format!("{node_type}|");
        scrub_nested(&mut self.by_property, &type_prefix, id);
        scrub_nested(&mut self.by_compound, &type_prefix, id);
        scrub_nested(&mut self.by_prefix, &type_prefix, id);
        self.by_range.retain(|axis, buckets| {
            if axis.starts_with(&type_prefix) {
                buckets.retain_mut(|bucket| {
                    bucket.ids.remove(id);
                    !bucket.ids.is_empty()
                });
            }
            !buckets.is_empty()
        });
    }

    /// Remove an id across every type's axes. Needed when the entity copy
    /// is gone (hydrated indexes) and the type cannot be recovered.
    pub fn scrub_id_everywhere(&mut self, id: &str) {
        self.by_type.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
        scrub_nested(&mut self.by_property, "", id);
        scrub_nested(&mut self.by_compound, "", id);
        scrub_nested(&mut self.by_prefix, "", id);
        self.by_range.retain(|_, buckets| {
            buckets.retain_mut(|bucket| {
                bucket.ids.remove(id);
                !bucket.ids.is_empty()
            });
            !buckets.is_empty()
        });
    }

    pub fn ids_by_type(&self, node_type: &str) -> Vec<String> {
        self.by_type
            .get(node_type)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_type(&self, node_type: &str) -> bool {
        self.by_type.contains_key(node_type)
    }

    pub fn ids_by_property(&self, node_type: &str, property: &str, value: &Value) -> Vec<String> {
        self.by_property
            .get(&axis_key(node_type, property))
            .and_then(|values| values.get(&value.to_string()))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn ids_by_compound(
        &self,
        node_type: &str,
        properties: &[String],
        values: &[Value],
    ) -> Vec<String> {
        let key = Value::Array(values.to_vec()).to_string();
        self.by_compound
            .get(&compound_key(node_type, properties))
            .and_then(|entries| entries.get(&key))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Candidate ids from buckets overlapping `[min, max]`. Callers re-run
    /// the exact predicate over the candidates.
    pub fn ids_by_range(&self, node_type: &str, property: &str, min: f64, max: f64) -> Vec<String> {
        let mut out = BTreeSet::new();
        if let Some(buckets) = self.by_range.get(&axis_key(node_type, property)) {
            for bucket in buckets {
                if bucket.min <= max && bucket.max >= min {
                    out.extend(bucket.ids.iter().cloned());
                }
            }
        }
        out.into_iter().collect()
    }

    pub fn ids_by_prefix(&self, node_type: &str, property: &str, prefix: &str) -> Vec<String> {
        self.by_prefix
            .get(&axis_key(node_type, property))
            .and_then(|prefixes| prefixes.get(prefix))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn index_relationship(&mut self, rel_type: &str, triple_key: &str) {
        self.rel_by_type
            .entry(rel_type.to_string())
            .or_default()
            .insert(triple_key.to_string());
    }

    pub fn unindex_relationship(&mut self, rel_type: &str, triple_key: &str) {
        if let Some(keys) = self.rel_by_type.get_mut(rel_type) {
            keys.remove(triple_key);
            if keys.is_empty() {
                self.rel_by_type.remove(rel_type);
            }
        }
    }

    pub fn relationship_keys_by_type(&self, rel_type: &str) -> Vec<String> {
        self.rel_by_type
            .get(rel_type)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.by_type.clear();
        self.by_property.clear();
        self.by_compound.clear();
        self.by_range.clear();
        self.by_prefix.clear();
        self.rel_by_type.clear();
    }
}

fn scrub_nested(
    map: &mut HashMap<String, HashMap<String, BTreeSet<String>>>,
    type_prefix: &str,
    id: &str,
) {
    map.retain(|axis, entries| {
        if axis.starts_with(type_prefix) {
            entries.retain(|_, ids| {
                ids.remove(id);
                !ids.is_empty()
            });
        }
        !entries.is_empty()
    });
}

/// Place a value into the bucket covering it, or open a new bucket whose
/// width is the running average of existing widths (100 when none exist),
/// clipped so buckets never overlap.
fn insert_into_buckets(buckets: &mut Vec<RangeBucket>, value: f64, id: &str) {
    if let Some(bucket) = buckets
        .iter_mut()
        .find(|b| b.min <= value && value < b.max)
    {
        bucket.ids.insert(id.to_string());
        return;
    }

    let width = if buckets.is_empty() {
        DEFAULT_RANGE_BUCKET_WIDTH
    } else {
        buckets.iter().map(|b| b.max - b.min).sum::<f64>() / buckets.len() as f64
    };

    let mut min = value;
    let mut max = value + width;
    for bucket in buckets.iter() {
        // Clip against any neighbor the new span would overlap.
        if bucket.min >= min && bucket.min < max {
            max = bucket.min;
        }
        if bucket.max > min && bucket.max <= max {
            min = bucket.max;
        }
    }
    if max <= value {
        // Degenerate clip; fall back to a single-value bucket.
        max = value + f64::EPSILON.max(value.abs() * f64::EPSILON);
    }

    let mut ids = BTreeSet::new();
    ids.insert(id.to_string());
    buckets.push(RangeBucket { min, max, ids });
    buckets.sort_by(|a, b| a.min.total_cmp(&b.min));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> plexus_core::PropertyMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn user(id: &str, properties: Value) -> Node {
        Node::new(id, "user", props(properties), vec!["read".into()])
    }

    #[test]
    fn type_and_property_axes() {
        let mut idx = IndexSet::default();
        idx.index_node(&user("u1", json!({"city": "NYC"})), &[], &[]);
        idx.index_node(&user("u2", json!({"city": "LA"})), &[], &[]);

        assert_eq!(idx.ids_by_type("user").len(), 2);
        assert_eq!(idx.ids_by_property("user", "city", &json!("NYC")), vec!["u1"]);
        assert!(idx.ids_by_property("user", "city", &json!("SF")).is_empty());
    }

    #[test]
    fn prefix_axis_covers_every_prefix() {
        let mut idx = IndexSet::default();
        idx.index_node(&user("u1", json!({"name": "alice"})), &[], &[]);

        for prefix in ["a", "al", "ali", "alic", "alice"] {
            assert_eq!(idx.ids_by_prefix("user", "name", prefix), vec!["u1"]);
        }
        assert!(idx.ids_by_prefix("user", "name", "b").is_empty());
        assert!(idx.ids_by_prefix("user", "name", "alices").is_empty());
    }

    #[test]
    fn compound_axis_requires_all_properties() {
        let specs = vec![CompoundIndexSpec {
            node_type: "user".into(),
            properties: vec!["city".into(), "age".into()],
        }];
        let mut idx = IndexSet::default();
        idx.index_node(&user("u1", json!({"city": "NYC", "age": 30})), &specs, &[]);
        idx.index_node(&user("u2", json!({"city": "NYC"})), &specs, &[]);

        let props: Vec<String> = vec!["city".into(), "age".into()];
        let hits = idx.ids_by_compound("user", &props, &[json!("NYC"), json!(30)]);
        assert_eq!(hits, vec!["u1"]);
    }

    #[test]
    fn range_axis_buckets_and_queries() {
        let specs = vec![RangeIndexSpec {
            node_type: "user".into(),
            property: "age".into(),
        }];
        let mut idx = IndexSet::default();
        for (id, age) in [("u1", 25), ("u2", 30), ("u3", 300)] {
            idx.index_node(&user(id, json!({ "age": age })), &[], &specs);
        }

        let hits = idx.ids_by_range("user", "age", 20.0, 40.0);
        assert!(hits.contains(&"u1".to_string()));
        assert!(hits.contains(&"u2".to_string()));
        // u3 sits in a separate bucket beyond the first 100-wide one.
        assert!(!idx.ids_by_range("user", "age", 20.0, 40.0).contains(&"u3".to_string()));
    }

    #[test]
    fn scrub_removes_everywhere() {
        let mut idx = IndexSet::default();
        idx.index_node(&user("u1", json!({"city": "NYC", "name": "alice"})), &[], &[]);
        idx.scrub_id("user", "u1");

        assert!(idx.ids_by_type("user").is_empty());
        assert!(idx.ids_by_property("user", "city", &json!("NYC")).is_empty());
        assert!(idx.ids_by_prefix("user", "name", "a").is_empty());
    }

    #[test]
    fn relationship_type_axis() {
        let mut idx = IndexSet::default();
        idx.index_relationship("FOLLOWS", "a|b|FOLLOWS");
        assert_eq!(idx.relationship_keys_by_type("FOLLOWS").len(), 1);
        idx.unindex_relationship("FOLLOWS", "a|b|FOLLOWS");
        assert!(idx.relationship_keys_by_type("FOLLOWS").is_empty());
    }
}
