//! Process-wide descriptor cache.
//!
//! Guarantees at most one descriptor per (entity type, kind) key and
//! serializes concurrent first-use through a single construction. The
//! cache check against staged keys is the cycle breaker: a worklist key is
//! staged before its related keys are visited, so self- and mutually-
//! referential schemas terminate instead of recursing forever.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::debug;

use trellis_meta::Catalog;

use crate::config::MirrorConfig;
use crate::descriptor::{DescriptorKey, NodeDescriptor, NodeKind};
use crate::error::MirrorResult;
use crate::factory;

/// Registry of generated node descriptors, shared across the process.
///
/// Constructed once at startup and passed by reference; descriptors live
/// for the lifetime of the registry.
pub struct ClassRegistry {
    catalog: Arc<Catalog>,
    config: MirrorConfig,
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    descriptors: HashMap<DescriptorKey, Arc<NodeDescriptor>>,
    constraints_installed: HashSet<DescriptorKey>,
}

impl ClassRegistry {
    pub fn new(catalog: Arc<Catalog>, config: MirrorConfig) -> Self {
        Self {
            catalog,
            config,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Return the cached descriptor for the key, building it (and every
    /// descriptor it transitively references) on first use.
    ///
    /// On any structural error the whole staged batch is discarded; no
    /// partial descriptor is ever cached.
    pub fn get_or_create(
        &self,
        entity: &str,
        kind: NodeKind,
    ) -> MirrorResult<Arc<NodeDescriptor>> {
        let root = DescriptorKey {
            entity: entity.to_string(),
            kind,
        };
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if let Some(descriptor) = inner.descriptors.get(&root) {
            return Ok(descriptor.clone());
        }

        let mut staged: HashMap<DescriptorKey, NodeDescriptor> = HashMap::new();
        let mut pending = vec![root.clone()];
        while let Some(key) = pending.pop() {
            if inner.descriptors.contains_key(&key) || staged.contains_key(&key) {
                continue;
            }
            let built = factory::build(&self.catalog, &self.config, &key)?;
            debug!(key = %key, label = %built.descriptor.label, "Built node descriptor");
            pending.extend(built.related);
            staged.insert(key, built.descriptor);
        }

        for (key, descriptor) in staged {
            inner.descriptors.insert(key, Arc::new(descriptor));
        }
        Ok(inner
            .descriptors
            .get(&root)
            .expect("root key was staged")
            .clone())
    }

    /// Look up a descriptor without constructing it.
    pub fn get(&self, key: &DescriptorKey) -> Option<Arc<NodeDescriptor>> {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .descriptors
            .get(key)
            .cloned()
    }

    /// Whether store constraints still need to be installed for this key.
    pub fn needs_constraints(&self, key: &DescriptorKey) -> bool {
        !self
            .inner
            .lock()
            .expect("registry lock poisoned")
            .constraints_installed
            .contains(key)
    }

    /// Record a successful constraint installation for this key.
    pub fn mark_constraints_installed(&self, key: &DescriptorKey) {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .constraints_installed
            .insert(key.clone());
    }

    /// Drop all cached descriptors and installation marks. Test hook.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.descriptors.clear();
        inner.constraints_installed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirrorError;
    use crate::testutil::{library_catalog, mutual_catalog, staff_catalog};

    #[test]
    fn test_get_or_create_returns_same_descriptor() {
        let registry = ClassRegistry::new(library_catalog(), MirrorConfig::default());
        let first = registry.get_or_create("Book", NodeKind::Instance).unwrap();
        let second = registry.get_or_create("Book", NodeKind::Instance).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_instance_and_schema_cached_separately() {
        let registry = ClassRegistry::new(library_catalog(), MirrorConfig::default());
        let instance = registry.get_or_create("Book", NodeKind::Instance).unwrap();
        let schema = registry.get_or_create("Book", NodeKind::Schema).unwrap();
        assert_eq!(instance.label, "BookNode");
        assert_eq!(schema.label, "BookMeta");
    }

    #[test]
    fn test_related_descriptors_built_transitively() {
        let registry = ClassRegistry::new(library_catalog(), MirrorConfig::default());
        registry.get_or_create("Book", NodeKind::Instance).unwrap();
        assert!(registry.get(&DescriptorKey::instance("Author")).is_some());
    }

    #[test]
    fn test_self_referential_type_terminates() {
        let registry = ClassRegistry::new(staff_catalog(), MirrorConfig::default());

        let instance = registry
            .get_or_create("Employee", NodeKind::Instance)
            .unwrap();
        // The self-relation is omitted from instance slots...
        assert!(instance.relationship("manager").is_none());
        assert!(instance.relationship("reports").is_none());

        // ...but present on the schema descriptor.
        let schema = registry.get_or_create("Employee", NodeKind::Schema).unwrap();
        assert!(schema.relationship("manager").is_some());
        assert!(schema.relationship("reports").is_some());
    }

    #[test]
    fn test_mutually_referential_types_fully_populated() {
        let registry = ClassRegistry::new(mutual_catalog(), MirrorConfig::default());
        let alpha = registry.get_or_create("Alpha", NodeKind::Instance).unwrap();
        let beta = registry
            .get(&DescriptorKey::instance("Beta"))
            .expect("Beta built during Alpha construction");

        assert_eq!(
            alpha.relationship("beta").unwrap().target,
            DescriptorKey::instance("Beta")
        );
        assert_eq!(
            beta.relationship("alpha").unwrap().target,
            DescriptorKey::instance("Alpha")
        );
    }

    #[test]
    fn test_unknown_entity_is_improperly_configured() {
        let registry = ClassRegistry::new(library_catalog(), MirrorConfig::default());
        let err = registry
            .get_or_create("Ghost", NodeKind::Instance)
            .unwrap_err();
        assert!(matches!(err, MirrorError::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_failed_construction_caches_nothing() {
        let registry = ClassRegistry::new(crate::testutil::pkless_catalog(), MirrorConfig::default());
        // Sound builds its own descriptor, then fails on the pk-less Orphan
        // it references; neither key may be cached afterwards.
        let err = registry.get_or_create("Sound", NodeKind::Instance).unwrap_err();
        assert!(matches!(err, MirrorError::MissingPrimaryKey(_)));
        assert!(registry.get(&DescriptorKey::instance("Sound")).is_none());
        assert!(registry.get(&DescriptorKey::instance("Orphan")).is_none());
    }

    #[test]
    fn test_constraint_gate() {
        let registry = ClassRegistry::new(library_catalog(), MirrorConfig::default());
        let key = DescriptorKey::instance("Book");
        assert!(registry.needs_constraints(&key));
        registry.mark_constraints_installed(&key);
        assert!(!registry.needs_constraints(&key));
        registry.reset();
        assert!(registry.needs_constraints(&key));
    }
}
