//! Graph store contract consumed by the synchronization engine.

pub mod memory;
pub mod neo4j;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use trellis_meta::Value;

use crate::descriptor::{NodeDescriptor, RelationshipSlot};
use crate::error::MirrorResult;

pub use memory::MemoryGraph;
pub use neo4j::Neo4jStore;

/// Opaque store-assigned node identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity(String);

impl NodeIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operations the mirror requires of a graph backend.
///
/// Identity lookups with unexpected cardinality surface as
/// `MultipleIdentitiesFound` / `IdentityNotFound`; connectivity failures
/// propagate unchanged. Nothing is retried here.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create or update the node with the given unique key, returning its
    /// store identity.
    async fn upsert_by_unique_key(
        &self,
        label: &str,
        key_property: &str,
        key: &Value,
        properties: &BTreeMap<String, Value>,
    ) -> MirrorResult<NodeIdentity>;

    /// Find at most one node matching all given properties.
    async fn find_by_properties(
        &self,
        label: &str,
        properties: &BTreeMap<String, Value>,
    ) -> MirrorResult<Option<NodeIdentity>>;

    /// Merge the relationship described by the slot between two nodes.
    async fn connect(
        &self,
        from: &NodeIdentity,
        slot: &RelationshipSlot,
        to: &NodeIdentity,
    ) -> MirrorResult<()>;

    /// Install label constraints and indexes for a descriptor.
    /// Idempotent; safe to repeat.
    async fn install_label_constraints(&self, descriptor: &NodeDescriptor) -> MirrorResult<()>;

    /// Run a parameterized traversal query, returning generic rows.
    /// Used only for identity lookups in this core.
    async fn run_traversal_query(
        &self,
        query: &str,
        params: &[(String, Value)],
    ) -> MirrorResult<Vec<BTreeMap<String, Value>>>;
}

/// Identifier sanitization for labels, property names, and relationship
/// types, which cannot travel as bound parameters in Cypher.
pub(crate) fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// The canonical instance-population query issued during schema sync.
pub(crate) fn population_query(label: &str) -> String {
    format!(
        "MATCH (n:{}) RETURN elementId(n) AS id",
        sanitize_identifier(label)
    )
}
