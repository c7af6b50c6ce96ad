//! Neo4j-backed graph store.
//!
//! Labels, property names, and relationship types cannot travel as bound
//! parameters in Cypher, so they are identifier-sanitized before being
//! spliced into query text. Data values always travel as parameters.

use std::collections::{BTreeMap, HashMap};

use anyhow::anyhow;
use async_trait::async_trait;
use neo4rs::{BoltList, BoltType, Query};
use tracing::debug;

use trellis_meta::Value;

use crate::client::GraphClient;
use crate::descriptor::{NodeDescriptor, RelationshipSlot};
use crate::error::{MirrorError, MirrorResult};
use crate::mapper::RelationshipKind;
use crate::store::{sanitize_identifier, GraphStore, NodeIdentity};

/// Graph store adapter over a Neo4j client.
#[derive(Clone)]
pub struct Neo4jStore {
    client: GraphClient,
}

impl Neo4jStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn upsert_by_unique_key(
        &self,
        label: &str,
        key_property: &str,
        key: &Value,
        properties: &BTreeMap<String, Value>,
    ) -> MirrorResult<NodeIdentity> {
        let label_ident = sanitize_identifier(label);
        let key_ident = sanitize_identifier(key_property);

        let mut set_clauses = Vec::new();
        let mut params: Vec<(String, BoltType)> = Vec::new();
        for (i, (name, value)) in properties
            .iter()
            .filter(|(name, _)| name.as_str() != key_property)
            .enumerate()
        {
            let prop = sanitize_identifier(name);
            match bolt_value(value) {
                Some(bolt) => {
                    let param = format!("p{i}");
                    set_clauses.push(format!("n.{prop} = ${param}"));
                    params.push((param, bolt));
                }
                // null clears the property; it is a keyword, not data.
                None => set_clauses.push(format!("n.{prop} = null")),
            }
        }
        let set_clause = if set_clauses.is_empty() {
            String::new()
        } else {
            format!(" SET {}", set_clauses.join(", "))
        };

        let key_param = bolt_value(key)
            .ok_or_else(|| MirrorError::Store(anyhow!("cannot upsert '{label}' with null key")))?;
        let mut query = Query::new(format!(
            "MERGE (n:{label_ident} {{{key_ident}: $key}}){set_clause} RETURN elementId(n) AS id"
        ))
        .param("key", key_param);
        for (name, bolt) in params {
            query = query.param(&name, bolt);
        }

        let rows = self.client.query(query).await?;
        match rows.as_slice() {
            [] => Err(MirrorError::IdentityNotFound {
                label: label.to_string(),
            }),
            [row] => {
                let id: String = row
                    .get("id")
                    .map_err(|e| anyhow!("upsert returned no id column: {e:?}"))?;
                debug!(label = %label, key = %key.key_repr(), id = %id, "Upserted node");
                Ok(NodeIdentity::new(id))
            }
            _ => Err(MirrorError::MultipleIdentitiesFound {
                label: label.to_string(),
                key: key.key_repr(),
            }),
        }
    }

    async fn find_by_properties(
        &self,
        label: &str,
        properties: &BTreeMap<String, Value>,
    ) -> MirrorResult<Option<NodeIdentity>> {
        let label_ident = sanitize_identifier(label);

        let mut where_clauses = Vec::new();
        let mut params: Vec<(String, BoltType)> = Vec::new();
        for (i, (name, value)) in properties.iter().enumerate() {
            let prop = sanitize_identifier(name);
            match bolt_value(value) {
                Some(bolt) => {
                    let param = format!("p{i}");
                    where_clauses.push(format!("n.{prop} = ${param}"));
                    params.push((param, bolt));
                }
                None => where_clauses.push(format!("n.{prop} IS NULL")),
            }
        }
        if where_clauses.is_empty() {
            return Ok(None);
        }

        let mut query = Query::new(format!(
            "MATCH (n:{label_ident}) WHERE {} RETURN elementId(n) AS id LIMIT 2",
            where_clauses.join(" AND ")
        ));
        for (name, bolt) in params {
            query = query.param(&name, bolt);
        }

        let rows = self.client.query(query).await?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => {
                let id: String = row
                    .get("id")
                    .map_err(|e| anyhow!("lookup returned no id column: {e:?}"))?;
                Ok(Some(NodeIdentity::new(id)))
            }
            _ => Err(MirrorError::MultipleIdentitiesFound {
                label: label.to_string(),
                key: format!("{properties:?}"),
            }),
        }
    }

    async fn connect(
        &self,
        from: &NodeIdentity,
        slot: &RelationshipSlot,
        to: &NodeIdentity,
    ) -> MirrorResult<()> {
        let rel = sanitize_identifier(&slot.rel_type);
        let pattern = match slot.direction {
            RelationshipKind::Forward => format!("(a)-[r:{rel}]->(b)"),
            RelationshipKind::Reverse => format!("(a)<-[r:{rel}]-(b)"),
            RelationshipKind::Mutual => format!("(a)-[r:{rel}]-(b)"),
        };
        let query = Query::new(format!(
            "MATCH (a) WHERE elementId(a) = $from
             MATCH (b) WHERE elementId(b) = $to
             MERGE {pattern}
             SET r.field_kind = $field_kind,
                 r.from_reverse = $from_reverse,
                 r.remote_field = $remote_field"
        ))
        .param("from", from.as_str())
        .param("to", to.as_str())
        .param("field_kind", slot.meta.field_kind.as_str())
        .param("from_reverse", slot.meta.from_reverse)
        .param("remote_field", slot.meta.remote_field.as_str());

        self.client.execute(query).await?;
        debug!(from = %from, rel = %rel, to = %to, "Merged relationship");
        Ok(())
    }

    async fn install_label_constraints(&self, descriptor: &NodeDescriptor) -> MirrorResult<()> {
        let label_ident = sanitize_identifier(&descriptor.label);
        for slot in descriptor.unique_properties() {
            let prop = sanitize_identifier(&slot.name);
            let statement = format!(
                "CREATE CONSTRAINT trellis_{label_ident}_{prop} IF NOT EXISTS \
                 FOR (n:{label_ident}) REQUIRE n.{prop} IS UNIQUE"
            );
            self.client.execute(Query::new(statement)).await?;
        }
        debug!(label = %descriptor.label, "Installed label constraints");
        Ok(())
    }

    async fn run_traversal_query(
        &self,
        query: &str,
        params: &[(String, Value)],
    ) -> MirrorResult<Vec<BTreeMap<String, Value>>> {
        let mut q = Query::new(query.to_string());
        for (name, value) in params {
            if let Some(bolt) = bolt_value(value) {
                q = q.param(name, bolt);
            }
        }

        let rows = self.client.query(q).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let map: HashMap<String, serde_json::Value> = row
                .to()
                .map_err(|e| anyhow!("failed to decode traversal row: {e:?}"))?;
            out.push(
                map.into_iter()
                    .map(|(name, json)| (name, json_to_value(json)))
                    .collect(),
            );
        }
        Ok(out)
    }
}

/// Convert a mirror value into a bolt parameter. Null has no bolt
/// parameter form and is handled as a keyword by the callers.
fn bolt_value(value: &Value) -> Option<BoltType> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some((*b).into()),
        Value::Int(i) => Some((*i).into()),
        Value::Float(f) => Some((*f).into()),
        Value::Text(t) => Some(t.clone().into()),
        Value::List(items) => {
            let list: Vec<BoltType> = items.iter().filter_map(bolt_value).collect();
            Some(BoltType::List(BoltList::from(list)))
        }
    }
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(json_to_value).collect())
        }
        other => Value::Text(other.to_string()),
    }
}
