//! # Trellis Graph
//!
//! Neo4j mirror of relational entities for graph-based access control.
//!
//! Maintains two parallel graph representations of a relational schema:
//! instance nodes (one per record, carrying scalar values and links to
//! related records) and schema nodes (one per entity type, carrying the
//! relation topology between types). Access-control rules are evaluated
//! as traversals over the mirrored graph instead of relational joins.

pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod mapper;
pub mod registry;
pub mod rules;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::{GraphClient, GraphConfig};
pub use config::MirrorConfig;
pub use descriptor::{
    DescriptorKey, NodeDescriptor, NodeKind, PropertySlot, RelationshipMeta, RelationshipSlot,
};
pub use error::{MirrorError, MirrorResult, PropertyIssue, ValidationErrors};
pub use mapper::{PropertyKind, RelationshipKind};
pub use registry::ClassRegistry;
pub use rules::AccessRule;
pub use store::{GraphStore, MemoryGraph, Neo4jStore, NodeIdentity};
pub use sync::{InstanceNode, SchemaNode, SyncEngine, SyncOptions, SyncReport};
