//! In-process graph store.
//!
//! Implements the full store contract against a node arena and a
//! relationship set. The test suite runs on it; it is also handy for
//! local development without a Neo4j instance.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use trellis_meta::Value;

use crate::descriptor::{NodeDescriptor, RelationshipSlot};
use crate::error::{MirrorError, MirrorResult};
use crate::mapper::RelationshipKind;
use crate::store::{GraphStore, NodeIdentity};

/// A stored node: label plus current property values.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub label: String,
    pub properties: BTreeMap<String, Value>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: u64,
    nodes: BTreeMap<String, MemoryNode>,
    /// (from identity, relationship type, to identity)
    relationships: BTreeSet<(String, String, String)>,
    /// (label, property) pairs with a uniqueness constraint installed.
    constraints: BTreeSet<(String, String)>,
}

impl MemoryInner {
    fn matching(&self, label: &str, properties: &BTreeMap<String, Value>) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, node)| {
                node.label == label
                    && properties.iter().all(|(name, value)| {
                        node.properties.get(name).unwrap_or(&Value::Null) == value
                    })
            })
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// In-memory [`GraphStore`] implementation.
#[derive(Default)]
pub struct MemoryGraph {
    inner: Mutex<MemoryInner>,
}

impl MemoryGraph {
    pub fn node_count(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .relationships
            .len()
    }

    /// Identities of every node with the given label.
    pub fn nodes_with_label(&self, label: &str) -> Vec<NodeIdentity> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .matching(label, &BTreeMap::new())
            .into_iter()
            .map(NodeIdentity::new)
            .collect()
    }

    /// Current property values of a node.
    pub fn node_properties(&self, identity: &NodeIdentity) -> Option<BTreeMap<String, Value>> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .nodes
            .get(identity.as_str())
            .map(|node| node.properties.clone())
    }

    /// First node with the given label and property value.
    pub fn find_node(&self, label: &str, property: &str, value: &Value) -> Option<NodeIdentity> {
        let mut props = BTreeMap::new();
        props.insert(property.to_string(), value.clone());
        self.inner
            .lock()
            .expect("store lock poisoned")
            .matching(label, &props)
            .into_iter()
            .next()
            .map(NodeIdentity::new)
    }

    pub fn has_relationship(&self, from: &NodeIdentity, rel_type: &str, to: &NodeIdentity) -> bool {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .relationships
            .contains(&(
                from.as_str().to_string(),
                rel_type.to_string(),
                to.as_str().to_string(),
            ))
    }

    pub fn has_constraint(&self, label: &str, property: &str) -> bool {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .constraints
            .contains(&(label.to_string(), property.to_string()))
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn upsert_by_unique_key(
        &self,
        label: &str,
        key_property: &str,
        key: &Value,
        properties: &BTreeMap<String, Value>,
    ) -> MirrorResult<NodeIdentity> {
        let mut inner = self.inner.lock().expect("store lock poisoned");

        let mut key_props = BTreeMap::new();
        key_props.insert(key_property.to_string(), key.clone());
        let matches = inner.matching(label, &key_props);

        match matches.as_slice() {
            [] => {
                inner.next_id += 1;
                let id = format!("mem:{}", inner.next_id);
                let mut props = properties.clone();
                props.insert(key_property.to_string(), key.clone());
                inner.nodes.insert(
                    id.clone(),
                    MemoryNode {
                        label: label.to_string(),
                        properties: props,
                    },
                );
                Ok(NodeIdentity::new(id))
            }
            [id] => {
                let id = id.clone();
                let node = inner.nodes.get_mut(&id).expect("matched node exists");
                node.properties.extend(properties.clone());
                Ok(NodeIdentity::new(id))
            }
            _ => Err(MirrorError::MultipleIdentitiesFound {
                label: label.to_string(),
                key: key.key_repr(),
            }),
        }
    }

    async fn find_by_properties(
        &self,
        label: &str,
        properties: &BTreeMap<String, Value>,
    ) -> MirrorResult<Option<NodeIdentity>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let matches = inner.matching(label, properties);
        match matches.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(NodeIdentity::new(id.clone()))),
            _ => Err(MirrorError::MultipleIdentitiesFound {
                label: label.to_string(),
                key: format!("{properties:?}"),
            }),
        }
    }

    async fn connect(
        &self,
        from: &NodeIdentity,
        slot: &RelationshipSlot,
        to: &NodeIdentity,
    ) -> MirrorResult<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let (a, b) = match slot.direction {
            RelationshipKind::Forward => (from.as_str(), to.as_str()),
            RelationshipKind::Reverse => (to.as_str(), from.as_str()),
            // Undirected: store one canonical ordering.
            RelationshipKind::Mutual => {
                if from.as_str() <= to.as_str() {
                    (from.as_str(), to.as_str())
                } else {
                    (to.as_str(), from.as_str())
                }
            }
        };
        inner
            .relationships
            .insert((a.to_string(), slot.rel_type.clone(), b.to_string()));
        Ok(())
    }

    async fn install_label_constraints(&self, descriptor: &NodeDescriptor) -> MirrorResult<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        for slot in descriptor.unique_properties() {
            inner
                .constraints
                .insert((descriptor.label.clone(), slot.name.clone()));
        }
        Ok(())
    }

    async fn run_traversal_query(
        &self,
        query: &str,
        _params: &[(String, Value)],
    ) -> MirrorResult<Vec<BTreeMap<String, Value>>> {
        // Supports the identity-lookup queries the engine issues; anything
        // else has no in-memory interpretation.
        let label = query
            .strip_prefix("MATCH (n:")
            .and_then(|rest| rest.strip_suffix(") RETURN elementId(n) AS id"))
            .ok_or_else(|| {
                MirrorError::Store(anyhow::anyhow!(
                    "memory store cannot interpret traversal query: {query}"
                ))
            })?;

        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .matching(label, &BTreeMap::new())
            .into_iter()
            .map(|id| {
                let mut row = BTreeMap::new();
                row.insert("id".to_string(), Value::Text(id));
                row
            })
            .collect())
    }
}
