//! Instance-node synchronization.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use tracing::debug;

use trellis_meta::{Record, RelationValue, Value};

use crate::descriptor::{NodeDescriptor, NodeKind};
use crate::error::{MirrorError, MirrorResult, PropertyIssue, ValidationErrors};
use crate::store::NodeIdentity;
use crate::sync::{InstanceNode, SyncEngine, SyncOptions, SyncPass};

impl SyncEngine {
    /// Mirror one record into the graph, reconciling identity with any
    /// pre-existing node and recursively connecting related records up to
    /// `max_depth` levels away.
    ///
    /// Returns `None` when the record's descriptor has no relationship
    /// slots and `create_empty` is off.
    pub async fn sync_record(
        &self,
        record: &Record,
        options: &SyncOptions,
    ) -> MirrorResult<Option<InstanceNode>> {
        let mut pass = SyncPass::default();
        self.sync_record_with(record, options.max_depth, options, &mut pass)
            .await
    }

    pub(crate) fn sync_record_with<'a>(
        &'a self,
        record: &'a Record,
        remaining: u32,
        options: &'a SyncOptions,
        pass: &'a mut SyncPass,
    ) -> BoxFuture<'a, MirrorResult<Option<InstanceNode>>> {
        Box::pin(async move {
            let entity = self
                .catalog()
                .get(&record.entity)
                .cloned()
                .ok_or_else(|| {
                    MirrorError::ImproperlyConfigured(format!(
                        "sync requested for unknown entity type '{}'",
                        record.entity
                    ))
                })?;
            let descriptor = self
                .registry()
                .get_or_create(&record.entity, NodeKind::Instance)?;
            self.ensure_constraints(&descriptor).await?;

            // Nodes with no relations are not worth mirroring unless
            // explicitly requested.
            if !descriptor.has_relations() && !options.create_empty {
                debug!(entity = %record.entity, "Descriptor has no relationship slots; skipping");
                return Ok(None);
            }

            let pk_field = entity.pk_field()?;
            let mut issues = ValidationErrors::default();
            let mut properties = BTreeMap::new();
            for slot in descriptor.properties() {
                let value = match slot.name.as_str() {
                    "pk" => record.value(&pk_field.name).cloned().unwrap_or(Value::Null),
                    "kind" => Value::Text(descriptor.key.kind.as_str().to_string()),
                    "entity" => Value::Text(descriptor.entity.clone()),
                    "namespace" => Value::Text(descriptor.namespace.clone()),
                    name => record.value(name).cloned().unwrap_or(Value::Null),
                };
                if slot.required && value.is_null() {
                    issues.add(&slot.name, PropertyIssue::Required);
                }
                properties.insert(slot.name.clone(), value);
            }

            let pk = properties.get("pk").cloned().unwrap_or(Value::Null);
            let mut node = InstanceNode {
                key: descriptor.key.clone(),
                label: descriptor.label.clone(),
                pk: pk.clone(),
                properties,
                identity: None,
                source: Some(record.clone()),
            };

            // Identity reconciliation runs before uniqueness validation so
            // a re-synced record sees itself, not a conflict.
            let mut existing = false;
            if options.update_existing && !pk.is_null() {
                let mut by_pk = BTreeMap::new();
                by_pk.insert("pk".to_string(), pk.clone());
                if let Some(identity) = self
                    .store()
                    .find_by_properties(&descriptor.label, &by_pk)
                    .await?
                {
                    node.identity = Some(identity);
                    existing = true;
                }
            }

            for slot in descriptor.unique_properties() {
                let value = node
                    .properties
                    .get(&slot.name)
                    .cloned()
                    .unwrap_or(Value::Null);
                if value.is_null() {
                    continue;
                }
                let mut probe = BTreeMap::new();
                probe.insert(slot.name.clone(), value);
                if let Some(found) = self
                    .store()
                    .find_by_properties(&descriptor.label, &probe)
                    .await?
                {
                    if node.identity.as_ref() != Some(&found) {
                        issues.add(&slot.name, PropertyIssue::UniquenessConflict);
                    }
                }
            }
            if !issues.is_empty() {
                return Err(MirrorError::Validation(issues));
            }

            let identity = self
                .store()
                .upsert_by_unique_key(
                    &descriptor.label,
                    &descriptor.key_property,
                    &node.pk,
                    &node.properties,
                )
                .await?;
            node.identity = Some(identity.clone());
            if existing {
                pass.report.nodes_updated += 1;
            } else {
                pass.report.nodes_created += 1;
            }
            debug!(label = %descriptor.label, pk = %node.pk.key_repr(), "Synced instance node");

            if remaining > 0 && pass.should_expand(&descriptor.label, &node.pk.key_repr(), remaining)
            {
                self.connect_instance_relations(record, &descriptor, &identity, remaining, options, pass)
                    .await?;
            }

            Ok(Some(node))
        })
    }

    /// Resolve each relationship slot's live value on the record and
    /// connect the related nodes, syncing them as needed.
    async fn connect_instance_relations(
        &self,
        record: &Record,
        descriptor: &NodeDescriptor,
        from: &NodeIdentity,
        remaining: u32,
        options: &SyncOptions,
        pass: &mut SyncPass,
    ) -> MirrorResult<()> {
        for slot in descriptor.relationships() {
            let Some(value) = record.relation(&slot.name) else {
                continue;
            };
            match value {
                RelationValue::One(target_ref) => {
                    let Some(target_record) = self.source().get(&target_ref.entity, &target_ref.pk)
                    else {
                        debug!(
                            entity = %target_ref.entity,
                            pk = %target_ref.pk.key_repr(),
                            "Related record not found; skipping"
                        );
                        continue;
                    };
                    let target = self
                        .sync_record_with(&target_record, remaining - 1, options, pass)
                        .await?;
                    if let Some(to) = target.and_then(|node| node.identity) {
                        self.store().connect(from, slot, &to).await?;
                        pass.report.relationships_created += 1;
                    }
                }
                RelationValue::Many(target_refs) => {
                    for target_ref in target_refs {
                        // Resolve against the store first; only members the
                        // graph has not seen yet are synced.
                        let target_label = self
                            .registry()
                            .get_or_create(&target_ref.entity, NodeKind::Instance)?
                            .label
                            .clone();
                        let mut by_pk = BTreeMap::new();
                        by_pk.insert("pk".to_string(), target_ref.pk.clone());
                        let to = match self
                            .store()
                            .find_by_properties(&target_label, &by_pk)
                            .await?
                        {
                            Some(identity) => Some(identity),
                            None => match self.source().get(&target_ref.entity, &target_ref.pk) {
                                Some(member) => self
                                    .sync_record_with(&member, remaining - 1, options, pass)
                                    .await?
                                    .and_then(|node| node.identity),
                                None => None,
                            },
                        };
                        if let Some(to) = to {
                            self.store().connect(from, slot, &to).await?;
                            pass.report.relationships_created += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
