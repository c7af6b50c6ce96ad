//! Reflection-once schema loading from a SQLite database.
//!
//! Walks `sqlite_master` and the table pragmas exactly once, producing a
//! plain [`Catalog`] that is consumed without any further reflection.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::Connection;
use tracing::debug;

use crate::catalog::Catalog;
use crate::entity::EntityType;
use crate::error::MetaResult;
use crate::field::FieldDescriptor;
use crate::kind::{RelationKind, ScalarKind};

impl Catalog {
    /// Reflect every user table of a SQLite database into a catalog.
    ///
    /// Columns become scalar fields typed by declared-type classification,
    /// foreign keys become forward relation fields, and single-column
    /// unique indexes mark their field as store-unique. Reverse relation
    /// fields are derived by the regular builder validation pass.
    pub fn from_sqlite(conn: &Connection, namespace: &str) -> MetaResult<Catalog> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        let mut builder = Catalog::builder();
        for table in &tables {
            let entity = reflect_table(conn, namespace, table)?;
            debug!(table = %table, entity = %entity.name, fields = entity.fields.len(), "Reflected table");
            builder = builder.entity(entity);
        }
        builder.finish()
    }
}

fn reflect_table(conn: &Connection, namespace: &str, table: &str) -> MetaResult<EntityType> {
    // column name -> referenced table
    let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list(\"{table}\")"))?;
    let foreign_keys: BTreeMap<String, String> = stmt
        .query_map([], |row| {
            let target: String = row.get(2)?;
            let from: String = row.get(3)?;
            Ok((from, target))
        })?
        .collect::<Result<_, _>>()?;

    let unique_columns = unique_columns(conn, table)?;

    let mut entity = EntityType::new(namespace, pascal_case(table));

    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                decl_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                pk: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for column in columns {
        let field = if let Some(target_table) = foreign_keys.get(&column.name) {
            let name = column
                .name
                .strip_suffix("_id")
                .unwrap_or(&column.name)
                .to_string();
            let mut field =
                FieldDescriptor::relation(name, RelationKind::ForeignKey, pascal_case(target_table));
            if column.not_null {
                field = field.required();
            }
            field
        } else {
            let kind = classify(column.decl_type.as_deref(), column.pk);
            let mut field = FieldDescriptor::scalar(&column.name, kind);
            if column.pk {
                field = field.primary_key();
            }
            if column.not_null {
                field = field.required();
            }
            if unique_columns.contains(&column.name) {
                field = field.unique();
            }
            field
        };
        entity.fields.push(field);
    }

    Ok(entity)
}

struct ColumnInfo {
    name: String,
    decl_type: Option<String>,
    not_null: bool,
    pk: bool,
}

/// Columns covered by a single-column unique index.
fn unique_columns(conn: &Connection, table: &str) -> MetaResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA index_list(\"{table}\")"))?;
    let unique_indexes: Vec<String> = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let unique: i64 = row.get(2)?;
            Ok((name, unique != 0))
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter_map(|(name, unique)| unique.then_some(name))
        .collect();

    let mut columns = BTreeSet::new();
    for index in unique_indexes {
        let mut stmt = conn.prepare(&format!("PRAGMA index_info(\"{index}\")"))?;
        let members: Vec<String> = stmt
            .query_map([], |row| row.get(2))?
            .collect::<Result<_, _>>()?;
        if let [column] = members.as_slice() {
            columns.insert(column.clone());
        }
    }
    Ok(columns)
}

/// Classify a declared column type into a scalar kind.
///
/// Follows SQLite's affinity conventions; unknown declarations fall back
/// to text, which is what SQLite itself stores them as.
fn classify(decl: Option<&str>, pk: bool) -> ScalarKind {
    let decl = decl.unwrap_or("").to_uppercase();
    if decl.contains("BIGINT") {
        return ScalarKind::BigInteger;
    }
    if decl.contains("SMALLINT") {
        return ScalarKind::SmallInteger;
    }
    if decl.contains("INT") {
        return if pk { ScalarKind::Auto } else { ScalarKind::Integer };
    }
    if decl.contains("BOOL") {
        return ScalarKind::Boolean;
    }
    if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
        return ScalarKind::Float;
    }
    if decl.contains("DECIMAL") || decl.contains("NUMERIC") {
        return ScalarKind::Decimal;
    }
    if decl.contains("DATETIME") || decl.contains("TIMESTAMP") {
        return ScalarKind::DateTime;
    }
    if decl.contains("DATE") {
        return ScalarKind::Date;
    }
    if decl.contains("TIME") {
        return ScalarKind::Time;
    }
    if decl.contains("UUID") {
        return ScalarKind::Uuid;
    }
    if decl.contains("JSON") {
        return ScalarKind::Json;
    }
    if decl.contains("BLOB") {
        return ScalarKind::Blob;
    }
    if decl.contains("CHAR") {
        return ScalarKind::VarChar;
    }
    ScalarKind::Text
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::FieldKind;

    fn library_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE authors (
                 id INTEGER PRIMARY KEY,
                 name VARCHAR(120) NOT NULL,
                 email TEXT UNIQUE
             );
             CREATE TABLE books (
                 id INTEGER PRIMARY KEY,
                 title TEXT NOT NULL,
                 published DATE,
                 author_id INTEGER NOT NULL REFERENCES authors(id)
             );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_reflects_tables_and_columns() {
        let catalog = Catalog::from_sqlite(&library_db(), "library").unwrap();
        assert_eq!(catalog.len(), 2);

        let authors = catalog.get("Authors").unwrap();
        assert_eq!(authors.pk_field().unwrap().name, "id");
        assert_eq!(
            authors.get_field("id").unwrap().kind,
            FieldKind::Scalar(ScalarKind::Auto)
        );
        assert!(authors.get_field("email").unwrap().unique);
        assert!(authors.get_field("name").unwrap().required);
    }

    #[test]
    fn test_foreign_key_becomes_relation() {
        let catalog = Catalog::from_sqlite(&library_db(), "library").unwrap();
        let books = catalog.get("Books").unwrap();
        let author = books.get_field("author").expect("fk field renamed");
        assert!(author.is_forward_relation());
        assert_eq!(author.related_type.as_deref(), Some("Authors"));

        // The reverse side is derived by the builder pass.
        let authors = catalog.get("Authors").unwrap();
        assert!(authors.get_field("books_set").is_some());
    }

    #[test]
    fn test_classify_declared_types() {
        assert_eq!(classify(Some("BIGINT"), false), ScalarKind::BigInteger);
        assert_eq!(classify(Some("VARCHAR(64)"), false), ScalarKind::VarChar);
        assert_eq!(classify(Some("DATETIME"), false), ScalarKind::DateTime);
        assert_eq!(classify(Some("BLOB"), false), ScalarKind::Blob);
        assert_eq!(classify(None, false), ScalarKind::Text);
    }
}
