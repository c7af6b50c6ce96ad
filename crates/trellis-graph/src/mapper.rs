//! Fixed mapping from relational field kinds to graph property and
//! relationship kinds.

use serde::{Deserialize, Serialize};

use trellis_meta::{RelationKind, ScalarKind};

use crate::error::{MirrorError, MirrorResult};

/// Graph property kinds a scalar field can mirror into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Integer,
    Float,
    Boolean,
    String,
    Array,
    Date,
    DateTime,
}

/// Directionality of a relationship slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Forward,
    Reverse,
    Mutual,
}

impl RelationshipKind {
    /// Fixed-vocabulary relationship type tag.
    pub fn default_tag(&self) -> &'static str {
        match self {
            Self::Forward => "FORWARD",
            Self::Reverse => "REVERSE",
            Self::Mutual => "MUTUAL",
        }
    }
}

/// Map a scalar field kind to its graph property kind.
///
/// The table is total over the supported schema language; a kind with no
/// graph representation is a hard error, never silently dropped.
pub fn property_kind(entity: &str, field: &str, kind: ScalarKind) -> MirrorResult<PropertyKind> {
    let mapped = match kind {
        ScalarKind::Auto
        | ScalarKind::BigAuto
        | ScalarKind::Integer
        | ScalarKind::BigInteger
        | ScalarKind::SmallInteger
        | ScalarKind::Time => PropertyKind::Integer,
        ScalarKind::Float | ScalarKind::Decimal => PropertyKind::Float,
        ScalarKind::Boolean => PropertyKind::Boolean,
        ScalarKind::Text
        | ScalarKind::VarChar
        | ScalarKind::Slug
        | ScalarKind::Email
        | ScalarKind::Url
        | ScalarKind::IpAddress
        | ScalarKind::Duration
        | ScalarKind::Uuid => PropertyKind::String,
        ScalarKind::Json => PropertyKind::Array,
        ScalarKind::Date => PropertyKind::Date,
        ScalarKind::DateTime => PropertyKind::DateTime,
        ScalarKind::Blob => {
            return Err(MirrorError::UnsupportedFieldKind {
                entity: entity.to_string(),
                field: field.to_string(),
                kind: kind.as_str().to_string(),
            });
        }
    };
    Ok(mapped)
}

/// Map a relation field kind to its relationship directionality.
pub fn relationship_kind(kind: RelationKind) -> RelationshipKind {
    match kind {
        RelationKind::ForeignKey | RelationKind::ManyToMany => RelationshipKind::Forward,
        RelationKind::OneToOne => RelationshipKind::Mutual,
        RelationKind::ManyToOneReverse
        | RelationKind::OneToOneReverse
        | RelationKind::ManyToManyReverse => RelationshipKind::Reverse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_mapping() {
        assert_eq!(
            property_kind("Book", "id", ScalarKind::Auto).unwrap(),
            PropertyKind::Integer
        );
        assert_eq!(
            property_kind("Book", "title", ScalarKind::VarChar).unwrap(),
            PropertyKind::String
        );
        assert_eq!(
            property_kind("Book", "price", ScalarKind::Decimal).unwrap(),
            PropertyKind::Float
        );
    }

    #[test]
    fn test_blob_is_unsupported() {
        let err = property_kind("Book", "cover", ScalarKind::Blob).unwrap_err();
        match err {
            MirrorError::UnsupportedFieldKind { field, kind, .. } => {
                assert_eq!(field, "cover");
                assert_eq!(kind, "blob");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_relation_directionality() {
        assert_eq!(
            relationship_kind(RelationKind::ForeignKey),
            RelationshipKind::Forward
        );
        assert_eq!(
            relationship_kind(RelationKind::OneToOne),
            RelationshipKind::Mutual
        );
        assert_eq!(
            relationship_kind(RelationKind::ManyToOneReverse),
            RelationshipKind::Reverse
        );
    }
}
