//! Access-rule records evaluated against the mirrored graph.
//!
//! A rule stores a traversal query between a source and a target entity
//! type, plus the permissions required on the target node. Rule-chain
//! evaluation (precedence, allow/deny combination) belongs to the
//! surrounding service; only the persisted record shape lives here.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted access rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRule {
    pub id: Uuid,
    /// Traversal query for this access rule, in the store's native query
    /// language, evaluated against the mirrored graph.
    pub query: String,
    /// Qualified source entity type name.
    pub source: String,
    /// Qualified target entity type name.
    pub target: String,
    /// Disable to skip evaluation of the rule in the rule chain.
    pub is_active: bool,
    /// Required permissions for the target node.
    pub permissions: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessRule {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            source: source.into(),
            target: target.into(),
            is_active: true,
            permissions: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a required permission label.
    pub fn require(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Bump the update timestamp after a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether the rule applies to a source/target type pair.
    pub fn applies_to(&self, source: &str, target: &str) -> bool {
        self.is_active && self.source == source && self.target == target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rule_defaults() {
        let rule = AccessRule::new(
            "library.author",
            "library.book",
            "MATCH (a:AuthorNode)-[]->(b:BookNode) RETURN b",
        );
        assert!(rule.is_active);
        assert!(rule.permissions.is_empty());
        assert_eq!(rule.created_at, rule.updated_at);
    }

    #[test]
    fn test_applies_to_respects_active_flag() {
        let mut rule = AccessRule::new("library.author", "library.book", "RETURN 1")
            .require("view");
        assert!(rule.applies_to("library.author", "library.book"));
        assert!(!rule.applies_to("library.book", "library.author"));

        rule.is_active = false;
        assert!(!rule.applies_to("library.author", "library.book"));
    }

    #[test]
    fn test_require_accumulates_permissions() {
        let rule = AccessRule::new("a", "b", "RETURN 1")
            .require("view")
            .require("change")
            .require("view");
        assert_eq!(rule.permissions.len(), 2);
        assert!(rule.permissions.contains("view"));
    }
}
