//! Entity types — named field collections mirrored into the graph.

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, MetaResult};
use crate::field::FieldDescriptor;

/// Default permission labels carried by every entity type unless
/// the schema declares its own set.
pub fn default_permissions() -> Vec<String> {
    ["add", "change", "delete", "view"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// A relational entity type: a named, ordered set of fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    pub namespace: String,
    pub fields: Vec<FieldDescriptor>,
    /// Declared permission/action labels, mirrored onto the schema node.
    pub permissions: Vec<String>,
}

impl EntityType {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            fields: Vec::new(),
            permissions: default_permissions(),
        }
    }

    /// Append a field, preserving declaration order.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Replace the permission label set.
    pub fn permissions(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.permissions = labels.into_iter().map(Into::into).collect();
        self
    }

    /// `<namespace>.<name>`, lower-cased — the type identity used in the graph.
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}",
            self.namespace.to_lowercase(),
            self.name.to_lowercase()
        )
    }

    /// The designated primary-key field.
    pub fn pk_field(&self) -> MetaResult<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.primary_key)
            .ok_or_else(|| MetaError::MissingPrimaryKey(self.name.clone()))
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Scalar fields in declaration order.
    pub fn scalar_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_relation())
    }

    /// Relations declared on this entity.
    pub fn forward_relation_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_forward_relation())
    }

    /// Relations derived from declarations on other entities.
    pub fn reverse_relation_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_reverse_relation())
    }

    /// All relation fields, forward then reverse, in declaration order.
    pub fn relation_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_relation())
    }
}
