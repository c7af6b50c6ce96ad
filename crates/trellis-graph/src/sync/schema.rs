//! Schema-node synchronization.
//!
//! Schema nodes mirror entity *types*: one node per type, connected to the
//! schema nodes of related types. Under the instance-linking configuration
//! each relation slot additionally connects to the full current instance
//! population of the related type.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use tracing::debug;

use trellis_meta::Value;

use crate::descriptor::NodeKind;
use crate::error::{MirrorError, MirrorResult};
use crate::store::{population_query, NodeIdentity};
use crate::sync::{SchemaNode, SyncEngine, SyncOptions, SyncPass};

impl SyncEngine {
    /// Mirror an entity type's schema node, recursively connecting the
    /// schema nodes of related types within the depth budget.
    pub async fn sync_schema(
        &self,
        entity: &str,
        options: &SyncOptions,
    ) -> MirrorResult<Option<SchemaNode>> {
        let mut pass = SyncPass::default();
        self.sync_schema_with(entity, options.max_depth, options, &mut pass)
            .await
    }

    pub(crate) fn sync_schema_with<'a>(
        &'a self,
        entity_name: &'a str,
        remaining: u32,
        options: &'a SyncOptions,
        pass: &'a mut SyncPass,
    ) -> BoxFuture<'a, MirrorResult<Option<SchemaNode>>> {
        Box::pin(async move {
            let entity = self.catalog().get(entity_name).cloned().ok_or_else(|| {
                MirrorError::ImproperlyConfigured(format!(
                    "schema sync requested for unknown entity type '{entity_name}'"
                ))
            })?;
            let descriptor = self.registry().get_or_create(entity_name, NodeKind::Schema)?;
            self.ensure_constraints(&descriptor).await?;

            if !descriptor.has_relations() && !options.create_empty {
                debug!(entity = %entity_name, "Schema descriptor has no relationship slots; skipping");
                return Ok(None);
            }

            let key = Value::Text(descriptor.entity.clone());
            let mut properties = BTreeMap::new();
            properties.insert("entity".to_string(), key.clone());
            properties.insert(
                "kind".to_string(),
                Value::Text(descriptor.key.kind.as_str().to_string()),
            );
            properties.insert(
                "namespace".to_string(),
                Value::Text(descriptor.namespace.clone()),
            );
            properties.insert(
                "permissions".to_string(),
                Value::List(
                    entity
                        .permissions
                        .iter()
                        .map(|label| Value::Text(label.clone()))
                        .collect(),
                ),
            );

            let mut node = SchemaNode {
                key: descriptor.key.clone(),
                label: descriptor.label.clone(),
                entity: descriptor.entity.clone(),
                properties,
                identity: None,
            };

            // The type name is the identity key; no record-data uniqueness
            // validation applies here.
            let mut existing = false;
            if options.update_existing {
                let mut by_key = BTreeMap::new();
                by_key.insert("entity".to_string(), key.clone());
                if let Some(identity) = self
                    .store()
                    .find_by_properties(&descriptor.label, &by_key)
                    .await?
                {
                    node.identity = Some(identity);
                    existing = true;
                }
            }

            let identity = self
                .store()
                .upsert_by_unique_key(
                    &descriptor.label,
                    &descriptor.key_property,
                    &key,
                    &node.properties,
                )
                .await?;
            node.identity = Some(identity.clone());
            if existing {
                pass.report.nodes_updated += 1;
            } else {
                pass.report.nodes_created += 1;
            }
            debug!(label = %descriptor.label, entity = %descriptor.entity, "Synced schema node");

            if remaining > 0 && pass.should_expand(&descriptor.label, &key.key_repr(), remaining) {
                for slot in descriptor.relationships() {
                    if slot.links_instances {
                        if !self.config().connect_schema_to_instances {
                            continue;
                        }
                        // Connect every existing instance node of the
                        // related type; instances are not re-synced here.
                        let target_label = self
                            .registry()
                            .get_or_create(&slot.target.entity, NodeKind::Instance)?
                            .label
                            .clone();
                        let rows = self
                            .store()
                            .run_traversal_query(&population_query(&target_label), &[])
                            .await?;
                        for row in rows {
                            if let Some(Value::Text(id)) = row.get("id") {
                                let to = NodeIdentity::new(id.clone());
                                self.store().connect(&identity, slot, &to).await?;
                                pass.report.relationships_created += 1;
                            }
                        }
                    } else if let Some(target) = self
                        .sync_schema_with(&slot.target.entity, remaining - 1, options, pass)
                        .await?
                    {
                        if let Some(to) = &target.identity {
                            self.store().connect(&identity, slot, to).await?;
                            pass.report.relationships_created += 1;
                        }
                    }
                }
            }

            Ok(Some(node))
        })
    }
}

#[cfg(test)]
mod tests {
    use trellis_meta::{Dataset, Record, RecordRef, RecordSource, Value};

    use crate::config::MirrorConfig;
    use crate::sync::SyncOptions;
    use crate::testutil::{engine_with, library_catalog, staff_catalog};

    #[tokio::test]
    async fn test_schema_pair_synced_and_connected() {
        let catalog = library_catalog();
        let dataset = Dataset::new(catalog.clone());
        let (engine, store, _) = engine_with(catalog, dataset, MirrorConfig::default());

        let node = engine
            .sync_schema("Book", &SyncOptions::default())
            .await
            .unwrap()
            .expect("book schema has relations");

        assert!(node.is_bound());
        assert_eq!(store.node_count(), 2);

        let book_meta = store
            .find_node("BookMeta", "entity", &Value::Text("library.book".into()))
            .unwrap();
        let author_meta = store
            .find_node("AuthorMeta", "entity", &Value::Text("library.author".into()))
            .unwrap();
        assert!(store.has_relationship(&book_meta, "FORWARD", &author_meta));
    }

    #[tokio::test]
    async fn test_schema_node_carries_permissions() {
        let catalog = library_catalog();
        let dataset = Dataset::new(catalog.clone());
        let (engine, store, _) = engine_with(catalog, dataset, MirrorConfig::default());

        let node = engine
            .sync_schema("Book", &SyncOptions::default())
            .await
            .unwrap()
            .unwrap();

        let props = store.node_properties(node.identity.as_ref().unwrap()).unwrap();
        let expected = Value::List(vec![
            Value::Text("add".into()),
            Value::Text("change".into()),
            Value::Text("delete".into()),
            Value::Text("view".into()),
        ]);
        assert_eq!(props.get("permissions"), Some(&expected));
    }

    #[tokio::test]
    async fn test_self_relation_present_at_schema_level() {
        let catalog = staff_catalog();
        let dataset = Dataset::new(catalog.clone());
        let (engine, store, _) = engine_with(catalog, dataset, MirrorConfig::default());

        engine
            .sync_schema("Employee", &SyncOptions::default())
            .await
            .unwrap();

        // One schema node, self-looped once per direction of the relation.
        assert_eq!(store.node_count(), 1);
        let meta = store
            .find_node("EmployeeMeta", "entity", &Value::Text("hr.employee".into()))
            .unwrap();
        assert!(store.has_relationship(&meta, "FORWARD", &meta));
        assert!(store.has_relationship(&meta, "REVERSE", &meta));
    }

    #[tokio::test]
    async fn test_schema_sync_idempotent() {
        let catalog = library_catalog();
        let dataset = Dataset::new(catalog.clone());
        let (engine, store, _) = engine_with(catalog, dataset, MirrorConfig::default());

        let first = engine
            .sync_schema("Book", &SyncOptions::default())
            .await
            .unwrap()
            .unwrap();
        let second = engine
            .sync_schema("Book", &SyncOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.identity, second.identity);
        assert_eq!(store.node_count(), 2);
    }

    #[tokio::test]
    async fn test_instance_linking_connects_population() {
        let catalog = library_catalog();
        let mut dataset = Dataset::new(catalog.clone());
        dataset
            .insert(
                Record::new("Author")
                    .set("id", 1)
                    .set("name", "Linked")
                    .set("email", "linked@example.org"),
            )
            .unwrap();
        dataset
            .insert(
                Record::new("Book")
                    .set("id", 1)
                    .set("title", "Linked Book")
                    .relate("author", RecordRef::new("Author", 1)),
            )
            .unwrap();
        let book = dataset.get("Book", &Value::Int(1)).unwrap();

        let config = MirrorConfig {
            connect_schema_to_instances: true,
            ..Default::default()
        };
        let (engine, store, _) = engine_with(catalog, dataset, config);

        // Mirror the instances first, then the schema graph on top.
        engine
            .sync_record(&book, &SyncOptions::default())
            .await
            .unwrap();
        engine
            .sync_schema("Book", &SyncOptions::default())
            .await
            .unwrap();

        let book_meta = store
            .find_node("BookMeta", "entity", &Value::Text("library.book".into()))
            .unwrap();
        let author_node = store.find_node("AuthorNode", "pk", &Value::Int(1)).unwrap();
        assert!(store.has_relationship(&book_meta, "INSTANCES", &author_node));
    }

    #[tokio::test]
    async fn test_schema_graph_covers_catalog() {
        let catalog = library_catalog();
        let dataset = Dataset::new(catalog.clone());
        let (engine, store, _) = engine_with(catalog, dataset, MirrorConfig::default());

        let report = engine
            .sync_schema_graph(&SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(store.node_count(), 2);
        assert_eq!(report.nodes_created, 2);
        // Forward edge from the declared FK, reverse edge from its inverse.
        assert_eq!(store.relationship_count(), 2);
    }
}
