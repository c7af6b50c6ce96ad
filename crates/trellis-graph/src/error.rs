//! Error types for the mirror core.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use trellis_meta::MetaError;

/// Why a property failed validation during sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyIssue {
    /// Another node already holds this value for a store-unique property.
    UniquenessConflict,
    /// A required property resolved to null.
    Required,
}

impl fmt::Display for PropertyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniquenessConflict => write!(f, "already exists"),
            Self::Required => write!(f, "is required"),
        }
    }
}

/// Validation failures for a sync call, listing every offending property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    issues: BTreeMap<String, PropertyIssue>,
}

impl ValidationErrors {
    pub fn add(&mut self, property: impl Into<String>, issue: PropertyIssue) {
        self.issues.insert(property.into(), issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn get(&self, property: &str) -> Option<PropertyIssue> {
        self.issues.get(property).copied()
    }

    /// Offending properties with their issues, in property order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, PropertyIssue)> {
        self.issues.iter().map(|(name, issue)| (name.as_str(), *issue))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|(name, issue)| format!("{name} {issue}"))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Main error type for descriptor construction and synchronization.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Field '{field}' on entity '{entity}' has unsupported kind '{kind}'")]
    UnsupportedFieldKind {
        entity: String,
        field: String,
        kind: String,
    },

    #[error("Entity type '{0}' has no primary key field")]
    MissingPrimaryKey(String),

    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Identity lookup for label '{label}' key '{key}' matched more than one node")]
    MultipleIdentitiesFound { label: String, key: String },

    #[error("Identity lookup for label '{label}' returned no node")]
    IdentityNotFound { label: String },

    #[error("Metadata error: {0}")]
    Meta(#[from] MetaError),

    #[error("Graph store error: {0}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for MirrorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;
