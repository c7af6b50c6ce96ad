//! Mirroring policy configuration.

use serde::Deserialize;

/// Knobs controlling how the relational schema is mirrored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Tag relationships with the upper-cased field/inverse name instead
    /// of the fixed FORWARD/REVERSE/MUTUAL vocabulary.
    pub named_relationships: bool,
    /// Give schema nodes an extra relationship per relation slot pointing
    /// at the full instance population of the related type.
    pub connect_schema_to_instances: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            named_relationships: false,
            connect_schema_to_instances: false,
        }
    }
}
