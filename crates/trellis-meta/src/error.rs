//! Error types for the metadata layer.

use thiserror::Error;

/// Main error type for catalog construction and reflection.
#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Entity type '{0}' has no primary key field")]
    MissingPrimaryKey(String),

    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Entity type '{entity}' declared more than once")]
    DuplicateEntityType { entity: String },

    #[error("Field '{field}' on entity '{entity}' declared more than once")]
    DuplicateField { entity: String, field: String },

    #[error("Relation field '{field}' on entity '{entity}' targets unknown type '{target}'")]
    UnknownRelatedType {
        entity: String,
        field: String,
        target: String,
    },

    #[error("Relation field '{field}' on entity '{entity}' is missing a related type")]
    MissingRelatedType { entity: String, field: String },

    #[error("Record for entity '{entity}' has no value for primary key field '{field}'")]
    MissingPrimaryKeyValue { entity: String, field: String },

    #[error("Schema reflection failed: {0}")]
    Reflection(#[from] rusqlite::Error),
}

/// Result type for metadata operations.
pub type MetaResult<T> = Result<T, MetaError>;
