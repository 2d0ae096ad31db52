//! Live-schema introspection.
//!
//! The change detector never reads the database directly; it consumes the
//! [`SchemaIntrospector`] trait, which reports existing tables and, per
//! table, a [`TableSnapshot`] whose column definitions use the same
//! normalized vocabulary the type mapper produces. [`PostgresIntrospector`]
//! implements the trait over `information_schema`.

use std::collections::BTreeMap;

use bedrock_core::{BedrockError, BedrockResult};
use bedrock_db::{DatabaseBackend, Value};

/// A point-in-time view of one table's columns.
///
/// Recomputed per diff run, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    /// The table name.
    pub name: String,
    /// Column name to normalized definition, ordered by column name.
    pub columns: BTreeMap<String, String>,
}

impl TableSnapshot {
    /// Creates a snapshot from a list of `(column, definition)` pairs.
    pub fn new(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().collect(),
        }
    }
}

/// Reports the live database schema in the mapper's vocabulary.
#[async_trait::async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Lists the names of all existing tables.
    async fn list_tables(&self) -> BedrockResult<Vec<String>>;

    /// Fetches a snapshot of the named table, or `None` if it does not
    /// exist.
    async fn table_snapshot(&self, name: &str) -> BedrockResult<Option<TableSnapshot>>;
}

/// Introspector for PostgreSQL, reading `information_schema`.
pub struct PostgresIntrospector<'a> {
    backend: &'a dyn DatabaseBackend,
}

impl<'a> PostgresIntrospector<'a> {
    /// Creates an introspector over the given backend.
    pub const fn new(backend: &'a dyn DatabaseBackend) -> Self {
        Self { backend }
    }

    async fn unique_columns(&self, table: &str) -> BedrockResult<Vec<String>> {
        let sql = "SELECT tc.constraint_name, ccu.column_name \
                   FROM information_schema.table_constraints tc \
                   JOIN information_schema.constraint_column_usage ccu \
                     ON tc.constraint_name = ccu.constraint_name \
                   WHERE tc.table_name = $1 \
                     AND tc.constraint_type IN ('UNIQUE', 'PRIMARY KEY')";
        let rows = self
            .backend
            .query(sql, &[Value::String(table.to_string())])
            .await
            .map_err(introspection)?;
        let pairs = rows
            .iter()
            .map(|row| {
                let constraint = row.get::<String>("constraint_name").map_err(introspection)?;
                let column = row.get::<String>("column_name").map_err(introspection)?;
                Ok((constraint, column))
            })
            .collect::<BedrockResult<Vec<_>>>()?;
        Ok(single_column_uniques(&pairs))
    }

    async fn references(&self, table: &str) -> BedrockResult<BTreeMap<String, (String, String)>> {
        let sql = "SELECT kcu.column_name, ccu.table_name AS ref_table, \
                          ccu.column_name AS ref_column \
                   FROM information_schema.table_constraints tc \
                   JOIN information_schema.key_column_usage kcu \
                     ON tc.constraint_name = kcu.constraint_name \
                   JOIN information_schema.constraint_column_usage ccu \
                     ON tc.constraint_name = ccu.constraint_name \
                   WHERE tc.table_name = $1 AND tc.constraint_type = 'FOREIGN KEY'";
        let rows = self
            .backend
            .query(sql, &[Value::String(table.to_string())])
            .await
            .map_err(introspection)?;
        let mut refs = BTreeMap::new();
        for row in &rows {
            let column = row.get::<String>("column_name").map_err(introspection)?;
            let ref_table = row.get::<String>("ref_table").map_err(introspection)?;
            let ref_column = row.get::<String>("ref_column").map_err(introspection)?;
            refs.insert(column, (ref_table, ref_column));
        }
        Ok(refs)
    }
}

#[async_trait::async_trait]
impl SchemaIntrospector for PostgresIntrospector<'_> {
    async fn list_tables(&self) -> BedrockResult<Vec<String>> {
        let sql = "SELECT table_name FROM information_schema.tables \
                   WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
                   ORDER BY table_name";
        let rows = self.backend.query(sql, &[]).await.map_err(introspection)?;
        rows.iter()
            .map(|row| row.get::<String>("table_name").map_err(introspection))
            .collect()
    }

    async fn table_snapshot(&self, name: &str) -> BedrockResult<Option<TableSnapshot>> {
        let sql = "SELECT column_name, data_type, udt_name, is_nullable, \
                          column_default, character_maximum_length \
                   FROM information_schema.columns \
                   WHERE table_schema = 'public' AND table_name = $1 \
                   ORDER BY ordinal_position";
        let rows = self
            .backend
            .query(sql, &[Value::String(name.to_string())])
            .await
            .map_err(introspection)?;
        if rows.is_empty() {
            return Ok(None);
        }

        let unique = self.unique_columns(name).await?;
        let refs = self.references(name).await?;

        let mut columns = BTreeMap::new();
        for row in &rows {
            let column = row.get::<String>("column_name").map_err(introspection)?;
            let data_type = row.get::<String>("data_type").map_err(introspection)?;
            let udt_name = row.get::<String>("udt_name").map_err(introspection)?;
            let is_nullable = row.get::<String>("is_nullable").map_err(introspection)?;
            let column_default = row
                .get::<Option<String>>("column_default")
                .map_err(introspection)?;
            let max_length = row
                .get::<Option<i64>>("character_maximum_length")
                .map_err(introspection)?;

            let definition = assemble_definition(
                &normalize_type(&data_type, &udt_name, max_length),
                unique.contains(&column),
                is_nullable == "NO",
                column_default.as_deref(),
                refs.get(&column),
            );
            columns.insert(column, definition);
        }

        Ok(Some(TableSnapshot {
            name: name.to_string(),
            columns,
        }))
    }
}

fn introspection(err: BedrockError) -> BedrockError {
    BedrockError::Introspection(err.to_string())
}

/// Keeps only the columns backed by a single-column constraint.
///
/// A column of a multi-column UNIQUE constraint is not column-level unique
/// and must not read back as `UNIQUE`.
fn single_column_uniques(pairs: &[(String, String)]) -> Vec<String> {
    let mut by_constraint: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (constraint, column) in pairs {
        by_constraint
            .entry(constraint.as_str())
            .or_default()
            .push(column.as_str());
    }
    by_constraint
        .values()
        .filter(|columns| columns.len() == 1)
        .map(|columns| columns[0].to_string())
        .collect()
}

/// Normalizes an `information_schema` type report into the mapper's
/// vocabulary.
pub fn normalize_type(data_type: &str, udt_name: &str, max_length: Option<i64>) -> String {
    match data_type {
        "character varying" => max_length.map_or_else(
            || "VARCHAR".to_string(),
            |n| format!("VARCHAR({n})"),
        ),
        "ARRAY" => {
            // udt_name carries the element type prefixed with an underscore
            let element = udt_name.strip_prefix('_').unwrap_or(udt_name);
            format!("{}[]", normalize_udt(element))
        }
        // tsvector and other extension types report as USER-DEFINED; only
        // udt_name carries the real type
        "USER-DEFINED" => normalize_udt(udt_name),
        other => other.to_uppercase(),
    }
}

fn normalize_udt(udt_name: &str) -> String {
    match udt_name {
        "int2" => "SMALLINT".to_string(),
        "int4" => "INTEGER".to_string(),
        "int8" => "BIGINT".to_string(),
        "float8" => "DOUBLE PRECISION".to_string(),
        "bool" => "BOOLEAN".to_string(),
        "varchar" => "VARCHAR".to_string(),
        "timestamptz" => "TIMESTAMP WITH TIME ZONE".to_string(),
        other => other.to_uppercase(),
    }
}

/// Assembles a normalized column definition from introspected pieces.
///
/// A sequence-backed default (`nextval(...)`) is what a serial column reads
/// back as; it is dropped so the column compares as `INTEGER UNIQUE NOT
/// NULL` against a declared `SERIAL PRIMARY KEY`.
pub fn assemble_definition(
    base_type: &str,
    unique: bool,
    not_null: bool,
    default: Option<&str>,
    reference: Option<&(String, String)>,
) -> String {
    let mut definition = base_type.to_string();
    if unique {
        definition.push_str(" UNIQUE");
    }
    if not_null {
        definition.push_str(" NOT NULL");
    }
    if let Some(default) = default {
        if !default.starts_with("nextval(") {
            definition.push_str(" DEFAULT ");
            definition.push_str(default);
        }
    }
    if let Some((table, column)) = reference {
        definition.push_str(&format!(" REFERENCES {table}({column})"));
    }
    definition
}
