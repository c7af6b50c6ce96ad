//! The entity-type catalog — a reflection-once metadata table.
//!
//! The catalog is built exactly once (from declarations or from SQLite
//! reflection) and consumed immutably thereafter. Reverse relation fields
//! are derived here from the forward declarations on the other side, so
//! the rest of the system never has to reason about both directions of
//! the same declaration.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::entity::EntityType;
use crate::error::{MetaError, MetaResult};
use crate::field::FieldDescriptor;
use crate::kind::FieldKind;

/// Immutable map of all known entity types, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: BTreeMap<String, Arc<EntityType>>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EntityType>> {
        self.types.get(name)
    }

    /// Entity types in name order.
    pub fn entity_types(&self) -> impl Iterator<Item = &Arc<EntityType>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Builder that validates cross-entity references and derives reverse
/// relation fields before freezing the catalog.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entities: Vec<EntityType>,
}

impl CatalogBuilder {
    /// Add an entity type declaration.
    pub fn entity(mut self, entity: EntityType) -> Self {
        self.entities.push(entity);
        self
    }

    /// Validate the declarations and freeze the catalog.
    pub fn finish(self) -> MetaResult<Catalog> {
        let mut entities = self.entities;

        // Names must be unique before anything can be cross-referenced.
        let mut seen = std::collections::BTreeSet::new();
        for entity in &entities {
            if !seen.insert(entity.name.clone()) {
                return Err(MetaError::DuplicateEntityType {
                    entity: entity.name.clone(),
                });
            }
        }

        for entity in &entities {
            validate_entity(entity, &seen)?;
        }

        derive_reverse_fields(&mut entities)?;

        let types = entities
            .into_iter()
            .map(|e| (e.name.clone(), Arc::new(e)))
            .collect();
        Ok(Catalog { types })
    }
}

fn validate_entity(
    entity: &EntityType,
    known: &std::collections::BTreeSet<String>,
) -> MetaResult<()> {
    let mut fields = std::collections::BTreeSet::new();
    for field in &entity.fields {
        if !fields.insert(field.name.clone()) {
            return Err(MetaError::DuplicateField {
                entity: entity.name.clone(),
                field: field.name.clone(),
            });
        }
        if field.is_relation() {
            match &field.related_type {
                None => {
                    return Err(MetaError::MissingRelatedType {
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                    });
                }
                Some(target) if !known.contains(target) => {
                    return Err(MetaError::UnknownRelatedType {
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                        target: target.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// For every forward relation A.f -> B, inject the derived reverse field
/// on B. The reverse field is named by the declared inverse name, falling
/// back to the pluralized `<a>_set` default.
fn derive_reverse_fields(entities: &mut [EntityType]) -> MetaResult<()> {
    let mut derived: Vec<(String, FieldDescriptor)> = Vec::new();

    for entity in entities.iter() {
        for field in entity.forward_relation_fields() {
            let kind = match field.kind {
                FieldKind::Relation(kind) => kind,
                FieldKind::Scalar(_) => continue,
            };
            let Some(inverse_kind) = kind.inverse() else {
                continue;
            };
            let target = field
                .related_type
                .clone()
                .expect("validated relation field has a target");
            let reverse_name = field
                .inverse_name
                .clone()
                .unwrap_or_else(|| format!("{}_set", entity.name.to_lowercase()));

            let mut reverse = FieldDescriptor::relation(reverse_name, inverse_kind, &entity.name);
            reverse.inverse_name = Some(field.name.clone());
            derived.push((target, reverse));
        }
    }

    for (target, reverse) in derived {
        let entity = entities
            .iter_mut()
            .find(|e| e.name == target)
            .expect("validated relation target exists");
        if entity.get_field(&reverse.name).is_some() {
            return Err(MetaError::DuplicateField {
                entity: entity.name.clone(),
                field: reverse.name.clone(),
            });
        }
        entity.fields.push(reverse);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{RelationKind, ScalarKind};

    fn book_author() -> Catalog {
        Catalog::builder()
            .entity(
                EntityType::new("library", "Author")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::scalar("name", ScalarKind::VarChar).required()),
            )
            .entity(
                EntityType::new("library", "Book")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::scalar("title", ScalarKind::VarChar))
                    .field(
                        FieldDescriptor::relation("author", RelationKind::ForeignKey, "Author")
                            .inverse("books")
                            .required(),
                    ),
            )
            .finish()
            .expect("catalog builds")
    }

    #[test]
    fn test_reverse_field_derived_with_inverse_name() {
        let catalog = book_author();
        let author = catalog.get("Author").unwrap();
        let books = author.get_field("books").expect("derived reverse field");
        assert!(books.is_reverse_relation());
        assert_eq!(books.related_type.as_deref(), Some("Book"));
        assert_eq!(books.inverse_name.as_deref(), Some("author"));
    }

    #[test]
    fn test_reverse_field_default_name() {
        let catalog = Catalog::builder()
            .entity(
                EntityType::new("crm", "Company")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key()),
            )
            .entity(
                EntityType::new("crm", "Contact")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::relation(
                        "company",
                        RelationKind::ForeignKey,
                        "Company",
                    )),
            )
            .finish()
            .unwrap();

        let company = catalog.get("Company").unwrap();
        assert!(company.get_field("contact_set").is_some());
    }

    #[test]
    fn test_unknown_related_type_rejected() {
        let result = Catalog::builder()
            .entity(
                EntityType::new("crm", "Contact")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(FieldDescriptor::relation(
                        "company",
                        RelationKind::ForeignKey,
                        "Company",
                    )),
            )
            .finish();
        assert!(matches!(
            result,
            Err(MetaError::UnknownRelatedType { .. })
        ));
    }

    #[test]
    fn test_self_reference_allowed() {
        let catalog = Catalog::builder()
            .entity(
                EntityType::new("hr", "Employee")
                    .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                    .field(
                        FieldDescriptor::relation("manager", RelationKind::ForeignKey, "Employee")
                            .inverse("reports"),
                    ),
            )
            .finish()
            .unwrap();

        let employee = catalog.get("Employee").unwrap();
        assert!(employee.get_field("manager").unwrap().is_forward_relation());
        assert!(employee.get_field("reports").unwrap().is_reverse_relation());
    }

    #[test]
    fn test_pk_field_lookup() {
        let catalog = book_author();
        let book = catalog.get("Book").unwrap();
        assert_eq!(book.pk_field().unwrap().name, "id");
        assert_eq!(book.qualified_name(), "library.book");
    }
}
