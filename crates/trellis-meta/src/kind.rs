//! Field kind vocabulary for the supported relational schema language.

use serde::{Deserialize, Serialize};

/// Scalar column kinds the mirror understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Auto,
    BigAuto,
    Integer,
    BigInteger,
    SmallInteger,
    Float,
    Decimal,
    Boolean,
    Text,
    VarChar,
    Slug,
    Email,
    Url,
    IpAddress,
    Date,
    DateTime,
    Time,
    Duration,
    Uuid,
    Json,
    Blob,
}

impl ScalarKind {
    /// Stable name used in relationship metadata and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::BigAuto => "big_auto",
            Self::Integer => "integer",
            Self::BigInteger => "big_integer",
            Self::SmallInteger => "small_integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::VarChar => "varchar",
            Self::Slug => "slug",
            Self::Email => "email",
            Self::Url => "url",
            Self::IpAddress => "ip_address",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Duration => "duration",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::Blob => "blob",
        }
    }
}

/// Relation field kinds, forward and reverse.
///
/// Forward kinds are declared on the owning entity; reverse kinds are
/// derived by the catalog builder from the forward declarations on the
/// other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ForeignKey,
    OneToOne,
    ManyToMany,
    ManyToOneReverse,
    OneToOneReverse,
    ManyToManyReverse,
}

impl RelationKind {
    /// Stable name used in relationship metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForeignKey => "foreign_key",
            Self::OneToOne => "one_to_one",
            Self::ManyToMany => "many_to_many",
            Self::ManyToOneReverse => "many_to_one_reverse",
            Self::OneToOneReverse => "one_to_one_reverse",
            Self::ManyToManyReverse => "many_to_many_reverse",
        }
    }

    /// True for kinds declared on the owning entity.
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::ForeignKey | Self::OneToOne | Self::ManyToMany)
    }

    /// True for kinds derived from a forward declaration on the other side.
    pub fn is_reverse(&self) -> bool {
        !self.is_forward()
    }

    /// The derived reverse counterpart of a forward kind.
    pub fn inverse(&self) -> Option<RelationKind> {
        match self {
            Self::ForeignKey => Some(Self::ManyToOneReverse),
            Self::OneToOne => Some(Self::OneToOneReverse),
            Self::ManyToMany => Some(Self::ManyToManyReverse),
            _ => None,
        }
    }

    /// True when the relation's value on a record is a collection.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Self::ManyToMany | Self::ManyToOneReverse | Self::ManyToManyReverse
        )
    }
}

/// A field is either a scalar column or a relation to another entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar(ScalarKind),
    Relation(RelationKind),
}

impl FieldKind {
    /// Stable name used in relationship metadata and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar(kind) => kind.as_str(),
            Self::Relation(kind) => kind.as_str(),
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Relation(_))
    }

    pub fn as_scalar(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(kind) => Some(*kind),
            Self::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<RelationKind> {
        match self {
            Self::Relation(kind) => Some(*kind),
            Self::Scalar(_) => None,
        }
    }
}
