//! Descriptor construction from entity metadata.
//!
//! Pure: reads the catalog, returns the built descriptor plus the keys of
//! every related descriptor. The registry drives the worklist; this module
//! never recurses.

use trellis_meta::{Catalog, EntityType, FieldDescriptor};

use crate::config::MirrorConfig;
use crate::descriptor::{
    DescriptorKey, NodeDescriptor, NodeKind, PropertySlot, RelationshipMeta, RelationshipSlot,
};
use crate::error::{MirrorError, MirrorResult};
use crate::mapper::{self, PropertyKind};

/// A constructed descriptor plus the related keys still to be resolved.
#[derive(Debug)]
pub(crate) struct BuiltDescriptor {
    pub descriptor: NodeDescriptor,
    pub related: Vec<DescriptorKey>,
}

/// Build the descriptor for one (entity type, kind) pair.
pub(crate) fn build(
    catalog: &Catalog,
    config: &MirrorConfig,
    key: &DescriptorKey,
) -> MirrorResult<BuiltDescriptor> {
    let entity = catalog.get(&key.entity).ok_or_else(|| {
        MirrorError::ImproperlyConfigured(format!(
            "{} node declared for unknown entity type '{}'",
            key.kind.as_str(),
            key.entity
        ))
    })?;

    // A pk-less entity is malformed regardless of which kind is built.
    let pk_field = entity
        .pk_field()
        .map_err(|_| MirrorError::MissingPrimaryKey(entity.name.clone()))?;

    let label = format!("{}{}", entity.name, key.kind.label_suffix());

    match key.kind {
        NodeKind::Instance => build_instance(entity, config, key, pk_field, label),
        NodeKind::Schema => build_schema(entity, config, key, label),
    }
}

fn build_instance(
    entity: &EntityType,
    config: &MirrorConfig,
    key: &DescriptorKey,
    pk_field: &FieldDescriptor,
    label: String,
) -> MirrorResult<BuiltDescriptor> {
    let pk_scalar = pk_field.kind.as_scalar().ok_or_else(|| {
        MirrorError::ImproperlyConfigured(format!(
            "primary key '{}' of entity '{}' is not a scalar field",
            pk_field.name, entity.name
        ))
    })?;
    let pk_kind = mapper::property_kind(&entity.name, &pk_field.name, pk_scalar)?;

    let mut properties = vec![
        PropertySlot::new("pk", pk_kind).unique().required(),
        PropertySlot::new("kind", PropertyKind::String).required(),
        PropertySlot::new("entity", PropertyKind::String).required(),
        PropertySlot::new("namespace", PropertyKind::String).required(),
    ];

    for field in entity.scalar_fields() {
        if field.primary_key {
            continue;
        }
        let scalar = field
            .kind
            .as_scalar()
            .expect("scalar_fields yields scalar kinds");
        let kind = mapper::property_kind(&entity.name, &field.name, scalar)?;
        let mut slot = PropertySlot::new(&field.name, kind);
        if field.unique {
            slot = slot.unique();
        }
        if field.required {
            slot = slot.required();
        }
        properties.push(slot);
    }

    let mut relationships = Vec::new();
    let mut related = Vec::new();
    for field in entity.relation_fields() {
        let target = related_type(entity, field)?;
        // A type referencing itself cannot be expanded at instance level
        // without an unresolvable recursive definition.
        if target == entity.name {
            continue;
        }
        let slot = relation_slot(entity, field, DescriptorKey::instance(target), config)?;
        related.push(slot.target.clone());
        relationships.push(slot);
    }

    let descriptor = NodeDescriptor::new(
        key.clone(),
        label,
        entity.qualified_name(),
        entity.namespace.to_lowercase(),
        "pk".to_string(),
        properties,
        relationships,
    );
    Ok(BuiltDescriptor { descriptor, related })
}

fn build_schema(
    entity: &EntityType,
    config: &MirrorConfig,
    key: &DescriptorKey,
    label: String,
) -> MirrorResult<BuiltDescriptor> {
    // Schema nodes mirror topology, not record data: the only properties
    // are the type identity and its declared permission labels.
    let properties = vec![
        PropertySlot::new("entity", PropertyKind::String).unique().required(),
        PropertySlot::new("kind", PropertyKind::String).required(),
        PropertySlot::new("namespace", PropertyKind::String).required(),
        PropertySlot::new("permissions", PropertyKind::Array),
    ];

    let mut relationships = Vec::new();
    let mut related = Vec::new();
    for field in entity.relation_fields() {
        let target = related_type(entity, field)?;
        let slot = relation_slot(entity, field, DescriptorKey::schema(target.clone()), config)?;
        related.push(slot.target.clone());

        if config.connect_schema_to_instances {
            let mut instance_slot = slot.clone();
            instance_slot.name = format!("{}_instances", slot.name);
            instance_slot.target = DescriptorKey::instance(target);
            instance_slot.rel_type = if config.named_relationships {
                format!("{}_INSTANCES", slot.name.to_uppercase())
            } else {
                "INSTANCES".to_string()
            };
            instance_slot.links_instances = true;
            related.push(instance_slot.target.clone());
            relationships.push(instance_slot);
        }

        relationships.push(slot);
    }

    let descriptor = NodeDescriptor::new(
        key.clone(),
        label,
        entity.qualified_name(),
        entity.namespace.to_lowercase(),
        "entity".to_string(),
        properties,
        relationships,
    );
    Ok(BuiltDescriptor { descriptor, related })
}

fn related_type<'a>(entity: &EntityType, field: &'a FieldDescriptor) -> MirrorResult<&'a str> {
    field.related_type.as_deref().ok_or_else(|| {
        MirrorError::ImproperlyConfigured(format!(
            "relation field '{}' on entity '{}' has no related type",
            field.name, entity.name
        ))
    })
}

fn relation_slot(
    entity: &EntityType,
    field: &FieldDescriptor,
    target: DescriptorKey,
    config: &MirrorConfig,
) -> MirrorResult<RelationshipSlot> {
    let relation = field
        .kind
        .as_relation()
        .expect("relation_fields yields relation kinds");
    let direction = mapper::relationship_kind(relation);

    let rel_type = if config.named_relationships {
        field.name.to_uppercase()
    } else {
        direction.default_tag().to_string()
    };

    // The dotted name of the declaring field on the many side: the field
    // itself for forward relations, the declared inverse for reverse ones.
    let remote_field = if field.is_reverse_relation() {
        format!(
            "{}.{}",
            target.entity.to_lowercase(),
            field.inverse_name.as_deref().unwrap_or(&field.name)
        )
    } else {
        format!("{}.{}", entity.name.to_lowercase(), field.name)
    };

    Ok(RelationshipSlot {
        name: field.name.clone(),
        target,
        direction,
        rel_type,
        meta: RelationshipMeta {
            field_kind: field.kind.as_str().to_string(),
            from_reverse: field.is_reverse_relation(),
            remote_field,
        },
        links_instances: false,
    })
}
