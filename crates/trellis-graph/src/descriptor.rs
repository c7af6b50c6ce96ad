//! Node descriptors — generated metadata describing a graph node's
//! properties and relationship slots for a given (entity type, kind).
//!
//! Relationship slots reference their target descriptor by key, resolved
//! through the [`ClassRegistry`](crate::registry::ClassRegistry). Holding
//! keys instead of descriptor references is what keeps self-referential
//! and mutually-referential schemas representable.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mapper::{PropertyKind, RelationshipKind};

/// Which of the two parallel graph representations a descriptor serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// One node per relational record.
    Instance,
    /// One node per entity type, topology only.
    Schema,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Schema => "schema",
        }
    }

    /// Label suffix distinguishing the two node populations.
    pub fn label_suffix(&self) -> &'static str {
        match self {
            Self::Instance => "Node",
            Self::Schema => "Meta",
        }
    }
}

/// Registry key identifying one generated descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptorKey {
    pub entity: String,
    pub kind: NodeKind,
}

impl DescriptorKey {
    pub fn instance(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            kind: NodeKind::Instance,
        }
    }

    pub fn schema(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            kind: NodeKind::Schema,
        }
    }
}

impl fmt::Display for DescriptorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity, self.kind.as_str())
    }
}

/// A scalar property position on a node descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySlot {
    pub name: String,
    pub kind: PropertyKind,
    pub unique: bool,
    pub required: bool,
}

impl PropertySlot {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unique: false,
            required: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Descriptive metadata carried on every mirrored relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMeta {
    /// The originating relational field kind.
    pub field_kind: String,
    /// Whether the slot was derived from a reverse relation.
    pub from_reverse: bool,
    /// Dotted name of the declaring field on the many side.
    pub remote_field: String,
}

/// A named, typed edge position on a node descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipSlot {
    pub name: String,
    /// Target descriptor, resolved via the registry.
    pub target: DescriptorKey,
    pub direction: RelationshipKind,
    /// Relationship type tag written to the store.
    pub rel_type: String,
    pub meta: RelationshipMeta,
    /// Marks the schema-kind slots that point at the instance population
    /// of the related type rather than its schema node.
    pub links_instances: bool,
}

/// Generated node shape for one (entity type, kind) pair.
///
/// Immutable after construction; the registry guarantees at most one
/// descriptor exists per key for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub key: DescriptorKey,
    pub label: String,
    /// Qualified entity type name (`namespace.name`).
    pub entity: String,
    pub namespace: String,
    /// Name of the property slot holding the node's unique key.
    pub key_property: String,
    properties: Vec<PropertySlot>,
    relationships: Vec<RelationshipSlot>,
    property_index: HashMap<String, usize>,
    relationship_index: HashMap<String, usize>,
}

impl NodeDescriptor {
    /// Assemble a descriptor and recompute its index views.
    pub(crate) fn new(
        key: DescriptorKey,
        label: String,
        entity: String,
        namespace: String,
        key_property: String,
        properties: Vec<PropertySlot>,
        relationships: Vec<RelationshipSlot>,
    ) -> Self {
        let property_index = properties
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.name.clone(), i))
            .collect();
        let relationship_index = relationships
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.name.clone(), i))
            .collect();
        Self {
            key,
            label,
            entity,
            namespace,
            key_property,
            properties,
            relationships,
            property_index,
            relationship_index,
        }
    }

    /// Property slots in declaration order.
    pub fn properties(&self) -> &[PropertySlot] {
        &self.properties
    }

    /// Relationship slots in declaration order.
    pub fn relationships(&self) -> &[RelationshipSlot] {
        &self.relationships
    }

    pub fn property(&self, name: &str) -> Option<&PropertySlot> {
        self.property_index.get(name).map(|&i| &self.properties[i])
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipSlot> {
        self.relationship_index
            .get(name)
            .map(|&i| &self.relationships[i])
    }

    /// Whether this node shape carries any relationship slots.
    pub fn has_relations(&self) -> bool {
        !self.relationships.is_empty()
    }

    /// Store-unique property slots.
    pub fn unique_properties(&self) -> impl Iterator<Item = &PropertySlot> {
        self.properties.iter().filter(|slot| slot.unique)
    }
}
