//! Shared fixtures for the crate's tests.

use std::sync::Arc;

use trellis_meta::{Catalog, Dataset, EntityType, FieldDescriptor, RelationKind, ScalarKind};

use crate::config::MirrorConfig;
use crate::registry::ClassRegistry;
use crate::store::memory::MemoryGraph;
use crate::sync::SyncEngine;

/// Author/Book pair: forward FK with declared inverse, unique email.
pub fn library_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .entity(
                EntityType::new("library", "Author")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::scalar("name", ScalarKind::VarChar).required())
                    .field(FieldDescriptor::scalar("email", ScalarKind::Email).unique()),
            )
            .entity(
                EntityType::new("library", "Book")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::scalar("title", ScalarKind::VarChar).required())
                    .field(
                        FieldDescriptor::relation("author", RelationKind::ForeignKey, "Author")
                            .inverse("books")
                            .required(),
                    ),
            )
            .finish()
            .expect("library catalog builds"),
    )
}

/// Self-referential type: Employee.manager -> Employee.
pub fn staff_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .entity(
                EntityType::new("hr", "Employee")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::scalar("name", ScalarKind::VarChar))
                    .field(
                        FieldDescriptor::relation("manager", RelationKind::ForeignKey, "Employee")
                            .inverse("reports"),
                    ),
            )
            .finish()
            .expect("staff catalog builds"),
    )
}

/// Mutually referential pair: Alpha.beta -> Beta, Beta.alpha -> Alpha.
pub fn mutual_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .entity(
                EntityType::new("pair", "Alpha")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(
                        FieldDescriptor::relation("beta", RelationKind::ForeignKey, "Beta")
                            .inverse("alphas"),
                    ),
            )
            .entity(
                EntityType::new("pair", "Beta")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(
                        FieldDescriptor::relation("alpha", RelationKind::ForeignKey, "Alpha")
                            .inverse("betas"),
                    ),
            )
            .finish()
            .expect("mutual catalog builds"),
    )
}

/// Alternating two-type chain: Employee.team -> Team, Team.lead -> Employee.
pub fn chain_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .entity(
                EntityType::new("org", "Employee")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::scalar("name", ScalarKind::VarChar))
                    .field(
                        FieldDescriptor::relation("team", RelationKind::ForeignKey, "Team")
                            .inverse("members"),
                    ),
            )
            .entity(
                EntityType::new("org", "Team")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::scalar("name", ScalarKind::VarChar))
                    .field(
                        FieldDescriptor::relation("lead", RelationKind::ForeignKey, "Employee")
                            .inverse("leading"),
                    ),
            )
            .finish()
            .expect("chain catalog builds"),
    )
}

/// Sound references Orphan, which has no primary key.
pub fn pkless_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .entity(
                EntityType::new("broken", "Sound")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::relation(
                        "orphan",
                        RelationKind::ForeignKey,
                        "Orphan",
                    )),
            )
            .entity(
                EntityType::new("broken", "Orphan")
                    .field(FieldDescriptor::scalar("label", ScalarKind::VarChar)),
            )
            .finish()
            .expect("pkless catalog builds"),
    )
}

/// Route engine tracing through the test writer when RUST_LOG is set.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine over a memory store for a given catalog/dataset/config.
pub fn engine_with(
    catalog: Arc<Catalog>,
    dataset: Dataset,
    config: MirrorConfig,
) -> (SyncEngine, Arc<MemoryGraph>, Arc<ClassRegistry>) {
    let registry = Arc::new(ClassRegistry::new(catalog, config));
    let store = Arc::new(MemoryGraph::default());
    let engine = SyncEngine::new(registry.clone(), store.clone(), Arc::new(dataset));
    (engine, store, registry)
}
