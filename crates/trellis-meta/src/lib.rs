//! # Trellis Meta
//!
//! Relational schema metadata for the Trellis graph mirror.
//!
//! Provides the entity-type catalog (a reflection-once metadata table),
//! field descriptors, and read-only record access used by the
//! synchronization engine in `trellis-graph`.

pub mod catalog;
pub mod entity;
pub mod error;
pub mod field;
pub mod kind;
pub mod record;
pub mod reflect;

pub use catalog::{Catalog, CatalogBuilder};
pub use entity::EntityType;
pub use error::{MetaError, MetaResult};
pub use field::FieldDescriptor;
pub use kind::{FieldKind, RelationKind, ScalarKind};
pub use record::{Dataset, Record, RecordRef, RecordSource, RelationValue, Value};
