//! Records and scalar values — the row data read during synchronization.
//!
//! Records reference related records by `(entity, primary key)` instead of
//! owning them, so arbitrarily cyclic datasets stay representable without
//! shared mutable object graphs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{MetaError, MetaResult};

/// A scalar value crossing the record/graph boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Stable string encoding usable as a map key.
    ///
    /// Prefixed per variant so `Int(1)` and `Text("1")` never collide.
    pub fn key_repr(&self) -> String {
        match self {
            Value::Null => "n".to_string(),
            Value::Bool(b) => format!("b:{b}"),
            Value::Int(i) => format!("i:{i}"),
            Value::Float(f) => format!("f:{f}"),
            Value::Text(t) => format!("t:{t}"),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::key_repr).collect();
                format!("l:[{}]", inner.join(","))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Reference to a record by entity type and primary-key value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRef {
    pub entity: String,
    pub pk: Value,
}

impl RecordRef {
    pub fn new(entity: impl Into<String>, pk: impl Into<Value>) -> Self {
        Self {
            entity: entity.into(),
            pk: pk.into(),
        }
    }
}

/// The live value of a relation field on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationValue {
    One(RecordRef),
    Many(Vec<RecordRef>),
}

/// One relational row: scalar values plus relation references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub entity: String,
    pub values: BTreeMap<String, Value>,
    pub relations: BTreeMap<String, RelationValue>,
}

impl Record {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            values: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Set a scalar field value.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Set a to-one relation.
    pub fn relate(mut self, field: impl Into<String>, target: RecordRef) -> Self {
        self.relations
            .insert(field.into(), RelationValue::One(target));
        self
    }

    /// Set a to-many relation.
    pub fn relate_many(mut self, field: impl Into<String>, targets: Vec<RecordRef>) -> Self {
        self.relations
            .insert(field.into(), RelationValue::Many(targets));
        self
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn relation(&self, field: &str) -> Option<&RelationValue> {
        self.relations.get(field)
    }
}

/// Read-only record access used by the synchronization engine.
pub trait RecordSource: Send + Sync {
    /// Fetch a single record by entity type and primary-key value.
    fn get(&self, entity: &str, pk: &Value) -> Option<Record>;

    /// All current records of an entity type.
    fn all(&self, entity: &str) -> Vec<Record>;
}

/// In-memory record source keyed by `(entity, pk)`.
pub struct Dataset {
    catalog: Arc<Catalog>,
    records: HashMap<(String, String), Record>,
}

impl Dataset {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            records: HashMap::new(),
        }
    }

    /// Insert or replace a record, keyed by its primary-key value.
    pub fn insert(&mut self, record: Record) -> MetaResult<()> {
        let entity = self
            .catalog
            .get(&record.entity)
            .ok_or_else(|| MetaError::UnknownEntityType(record.entity.clone()))?;
        let pk_field = entity.pk_field()?;
        let pk = record.value(&pk_field.name).cloned().ok_or_else(|| {
            MetaError::MissingPrimaryKeyValue {
                entity: record.entity.clone(),
                field: pk_field.name.clone(),
            }
        })?;
        self.records
            .insert((record.entity.clone(), pk.key_repr()), record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for Dataset {
    fn get(&self, entity: &str, pk: &Value) -> Option<Record> {
        self.records
            .get(&(entity.to_string(), pk.key_repr()))
            .cloned()
    }

    fn all(&self, entity: &str) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .records
            .iter()
            .filter(|((e, _), _)| e == entity)
            .map(|(_, r)| r.clone())
            .collect();
        // Keyed storage is unordered; keep output deterministic.
        records.sort_by_key(|r| {
            r.values
                .values()
                .next()
                .map(Value::key_repr)
                .unwrap_or_default()
        });
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::field::FieldDescriptor;
    use crate::kind::ScalarKind;

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::builder()
                .entity(
                    EntityType::new("library", "Author")
                        .field(FieldDescriptor::scalar("id", ScalarKind::Auto).primary_key())
                        .field(FieldDescriptor::scalar("name", ScalarKind::VarChar)),
                )
                .finish()
                .unwrap(),
        )
    }

    #[test]
    fn test_dataset_insert_and_get() {
        let mut dataset = Dataset::new(catalog());
        dataset
            .insert(Record::new("Author").set("id", 1).set("name", "Ursula"))
            .unwrap();

        let record = dataset.get("Author", &Value::Int(1)).expect("record found");
        assert_eq!(record.value("name"), Some(&Value::Text("Ursula".into())));
        assert!(dataset.get("Author", &Value::Int(2)).is_none());
    }

    #[test]
    fn test_insert_without_pk_value_fails() {
        let mut dataset = Dataset::new(catalog());
        let result = dataset.insert(Record::new("Author").set("name", "Anonymous"));
        assert!(matches!(
            result,
            Err(MetaError::MissingPrimaryKeyValue { .. })
        ));
    }

    #[test]
    fn test_key_repr_distinguishes_types() {
        assert_ne!(Value::Int(1).key_repr(), Value::Text("1".into()).key_repr());
    }
}
