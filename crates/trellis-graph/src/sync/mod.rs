//! Relational-to-graph synchronization engine.
//!
//! Mirrors records (instance nodes) and entity types (schema nodes) into
//! the graph store, reconciling identity with pre-existing nodes and
//! recursively connecting related nodes under a caller-specified depth
//! budget. Related nodes are processed sequentially; a caller may run
//! independent top-level sync calls concurrently.

pub mod instance;
pub mod schema;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::info;

use trellis_meta::{Catalog, Record, RecordSource, Value};

use crate::config::MirrorConfig;
use crate::descriptor::{DescriptorKey, NodeDescriptor};
use crate::error::MirrorResult;
use crate::registry::ClassRegistry;
use crate::store::{GraphStore, NodeIdentity};

/// Options controlling a synchronization call.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum recursive connection radius from the synced node.
    pub max_depth: u32,
    /// Adopt the identity of an existing node with the same key so the
    /// upsert overwrites instead of duplicating.
    pub update_existing: bool,
    /// Also mirror nodes whose descriptor has no relationship slots.
    pub create_empty: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            update_existing: true,
            create_empty: false,
        }
    }
}

/// Result counters for a sync operation.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub relationships_created: usize,
}

impl SyncReport {
    pub fn merge(&mut self, other: &SyncReport) {
        self.nodes_created += other.nodes_created;
        self.nodes_updated += other.nodes_updated;
        self.relationships_created += other.relationships_created;
    }
}

/// A mirrored record node; bound once the store has assigned an identity.
#[derive(Debug, Clone)]
pub struct InstanceNode {
    pub key: DescriptorKey,
    pub label: String,
    pub pk: Value,
    pub properties: BTreeMap<String, Value>,
    pub identity: Option<NodeIdentity>,
    /// Back-reference to the source record; absent when the node was
    /// loaded purely from the graph.
    pub source: Option<Record>,
}

impl InstanceNode {
    pub fn is_bound(&self) -> bool {
        self.identity.is_some()
    }
}

/// A mirrored entity-type node.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub key: DescriptorKey,
    pub label: String,
    /// Qualified entity type name — the node's unique key.
    pub entity: String,
    pub properties: BTreeMap<String, Value>,
    pub identity: Option<NodeIdentity>,
}

impl SchemaNode {
    pub fn is_bound(&self) -> bool {
        self.identity.is_some()
    }
}

/// Per-call recursion bookkeeping: for each visited node, the largest
/// remaining budget its relations were expanded with.
#[derive(Default)]
pub(crate) struct SyncPass {
    visited: HashMap<(String, String), u32>,
    pub(crate) report: SyncReport,
}

impl SyncPass {
    /// Whether relations should be expanded for this node at this budget.
    ///
    /// A node already expanded with at least this much budget is skipped;
    /// this is what bounds traversal of cyclic schemas to a finite radius.
    pub(crate) fn should_expand(&mut self, label: &str, key: &str, remaining: u32) -> bool {
        let entry = (label.to_string(), key.to_string());
        match self.visited.get(&entry) {
            Some(&previous) if previous >= remaining => false,
            _ => {
                self.visited.insert(entry, remaining);
                true
            }
        }
    }
}

/// Synchronization engine over a record source and a graph store.
pub struct SyncEngine {
    registry: Arc<ClassRegistry>,
    store: Arc<dyn GraphStore>,
    source: Arc<dyn RecordSource>,
}

impl SyncEngine {
    pub fn new(
        registry: Arc<ClassRegistry>,
        store: Arc<dyn GraphStore>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        Self {
            registry,
            store,
            source,
        }
    }

    pub(crate) fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub(crate) fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    pub(crate) fn source(&self) -> &dyn RecordSource {
        self.source.as_ref()
    }

    pub(crate) fn catalog(&self) -> &Arc<Catalog> {
        self.registry.catalog()
    }

    pub(crate) fn config(&self) -> &MirrorConfig {
        self.registry.config()
    }

    /// Install store constraints for a descriptor on its first use.
    pub(crate) async fn ensure_constraints(&self, descriptor: &NodeDescriptor) -> MirrorResult<()> {
        if self.registry.needs_constraints(&descriptor.key) {
            self.store.install_label_constraints(descriptor).await?;
            self.registry.mark_constraints_installed(&descriptor.key);
        }
        Ok(())
    }

    /// Sync every current record of an entity type.
    pub async fn sync_entity(
        &self,
        entity: &str,
        options: &SyncOptions,
    ) -> MirrorResult<SyncReport> {
        let records = self.source.all(entity);
        let mut pass = SyncPass::default();
        for record in &records {
            self.sync_record_with(record, options.max_depth, options, &mut pass)
                .await?;
        }
        info!(
            entity,
            nodes = pass.report.nodes_created + pass.report.nodes_updated,
            relationships = pass.report.relationships_created,
            "Entity synced"
        );
        Ok(pass.report)
    }

    /// Sync the schema node of every entity type in the catalog.
    pub async fn sync_schema_graph(&self, options: &SyncOptions) -> MirrorResult<SyncReport> {
        info!("Starting schema graph sync");
        let names: Vec<String> = self
            .catalog()
            .entity_types()
            .map(|entity| entity.name.clone())
            .collect();

        let mut pass = SyncPass::default();
        for name in &names {
            self.sync_schema_with(name, options.max_depth, options, &mut pass)
                .await?;
        }
        info!(
            nodes = pass.report.nodes_created + pass.report.nodes_updated,
            relationships = pass.report.relationships_created,
            "Schema graph sync complete"
        );
        Ok(pass.report)
    }
}
