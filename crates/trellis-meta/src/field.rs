//! Field descriptors — the per-column metadata consumed by the mirror.

use serde::{Deserialize, Serialize};

use crate::kind::{FieldKind, RelationKind, ScalarKind};

/// Metadata for a single field of an entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub primary_key: bool,
    pub unique: bool,
    pub required: bool,
    /// Name of the related entity type, for relation fields.
    pub related_type: Option<String>,
    /// Name of the field on the other side of the relation, if known.
    pub inverse_name: Option<String>,
}

impl FieldDescriptor {
    /// A scalar column field.
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar(kind),
            primary_key: false,
            unique: false,
            required: false,
            related_type: None,
            inverse_name: None,
        }
    }

    /// A relation field targeting another entity type.
    pub fn relation(
        name: impl Into<String>,
        kind: RelationKind,
        related_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Relation(kind),
            primary_key: false,
            unique: false,
            required: false,
            related_type: Some(related_type.into()),
            inverse_name: None,
        }
    }

    /// Mark this field as the primary key. Implies unique and required.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.unique = true;
        self.required = true;
        self
    }

    /// Mark this field as store-unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark this field as required (non-null).
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declare the inverse field name on the other side of the relation.
    pub fn inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse_name = Some(name.into());
        self
    }

    pub fn is_relation(&self) -> bool {
        self.kind.is_relation()
    }

    /// True for relations declared on this entity.
    pub fn is_forward_relation(&self) -> bool {
        self.kind
            .as_relation()
            .map(|kind| kind.is_forward())
            .unwrap_or(false)
    }

    /// True for relations derived from the other side's declaration.
    pub fn is_reverse_relation(&self) -> bool {
        self.kind
            .as_relation()
            .map(|kind| kind.is_reverse())
            .unwrap_or(false)
    }
}
