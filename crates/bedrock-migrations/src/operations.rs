//! The closed set of schema-change operations.
//!
//! Each [`Operation`] variant renders exactly one category of DDL. An
//! operation can describe itself for operator-facing logs, render its SQL
//! statements, and apply itself against a [`DatabaseBackend`]. Operations
//! are immutable once constructed and serialize with a `type` tag so
//! migration files are portable.

use bedrock_core::BedrockResult;
use bedrock_db::DatabaseBackend;

use crate::column::{decompose, SERIAL_PRIMARY_KEY};

/// One column of a [`Operation::CreateTable`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColumnSpec {
    /// The column name.
    pub name: String,
    /// The normalized column definition.
    pub definition: String,
}

impl ColumnSpec {
    /// Creates a column spec.
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// A single schema-change command.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// Creates a table with the given columns.
    CreateTable {
        /// The table name.
        name: String,
        /// The columns, in creation order.
        columns: Vec<ColumnSpec>,
    },
    /// Adds a column to an existing table.
    AddField {
        /// The table name.
        table: String,
        /// The column name.
        column: String,
        /// The normalized column definition.
        definition: String,
    },
    /// Alters an existing column to match the desired definition.
    AlterField {
        /// The table name.
        table: String,
        /// The column name.
        column: String,
        /// The desired column definition.
        definition: String,
    },
    /// Drops a column from an existing table.
    RemoveField {
        /// The table name.
        table: String,
        /// The column name.
        column: String,
    },
    /// Runs a literal SQL statement verbatim. The escape hatch for deltas
    /// the change detector cannot express (data backfills, renames).
    RunSql {
        /// The statement to execute.
        statement: String,
    },
}

impl Operation {
    /// A short human-readable summary for operator-facing logs.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { name, columns } => {
                format!("Create table {name} ({} columns)", columns.len())
            }
            Self::AddField { table, column, .. } => format!("Add field {column} to {table}"),
            Self::AlterField { table, column, .. } => format!("Alter field {column} on {table}"),
            Self::RemoveField { table, column } => format!("Remove field {column} from {table}"),
            Self::RunSql { .. } => "Run SQL".to_string(),
        }
    }

    /// Renders the DDL statements this operation executes, in order.
    pub fn statements(&self) -> Vec<String> {
        match self {
            Self::CreateTable { name, columns } => {
                let cols = columns
                    .iter()
                    .map(|c| format!("{} {}", c.name, c.definition))
                    .collect::<Vec<_>>()
                    .join(", ");
                vec![format!("CREATE TABLE IF NOT EXISTS {name} ({cols})")]
            }
            Self::AddField {
                table,
                column,
                definition,
            } => vec![format!(
                "ALTER TABLE {table} ADD COLUMN {column} {definition}"
            )],
            Self::AlterField {
                table,
                column,
                definition,
            } => alter_statements(table, column, definition),
            Self::RemoveField { table, column } => vec![format!(
                "ALTER TABLE {table} DROP COLUMN IF EXISTS {column} CASCADE"
            )],
            Self::RunSql { statement } => vec![statement.clone()],
        }
    }

    /// Executes this operation against the backend.
    ///
    /// # Errors
    ///
    /// Returns the first statement error; earlier statements of this
    /// operation stay applied.
    pub async fn apply(&self, backend: &dyn DatabaseBackend) -> BedrockResult<()> {
        for sql in self.statements() {
            tracing::debug!(sql = %sql, "executing DDL");
            backend.execute(&sql, &[]).await?;
        }
        Ok(())
    }
}

/// Renders the statements for an `AlterField`.
///
/// The desired definition is decomposed into base type, `UNIQUE`, and
/// `NOT NULL`; up to three statements are issued. A `SERIAL PRIMARY KEY`
/// definition produces no statements, a primary key's storage type is never
/// re-altered. The unique constraint name is derived from table and column
/// so re-application is idempotent.
fn alter_statements(table: &str, column: &str, definition: &str) -> Vec<String> {
    if definition == SERIAL_PRIMARY_KEY {
        return Vec::new();
    }

    let parts = decompose(definition);
    let mut statements = vec![format!(
        "ALTER TABLE {table} ALTER COLUMN {column} TYPE {base} USING {column}::{base}",
        base = parts.base_type
    )];

    if parts.not_null {
        statements.push(format!(
            "ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL"
        ));
    } else {
        statements.push(format!(
            "ALTER TABLE {table} ALTER COLUMN {column} DROP NOT NULL"
        ));
    }

    if parts.unique {
        let constraint = format!("uq_{table}_{column}");
        statements.push(format!(
            "ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {constraint}"
        ));
        statements.push(format!(
            "ALTER TABLE {table} ADD CONSTRAINT {constraint} UNIQUE ({column})"
        ));
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── CreateTable ─────────────────────────────────────────────────

    #[test]
    fn test_create_table_sql() {
        let op = Operation::CreateTable {
            name: "users".into(),
            columns: vec![
                ColumnSpec::new("id", "SERIAL PRIMARY KEY"),
                ColumnSpec::new("name", "VARCHAR(150) NOT NULL"),
            ],
        };
        assert_eq!(
            op.statements(),
            vec![
                "CREATE TABLE IF NOT EXISTS users (id SERIAL PRIMARY KEY, name VARCHAR(150) NOT NULL)"
            ]
        );
    }

    #[test]
    fn test_create_table_describe() {
        let op = Operation::CreateTable {
            name: "users".into(),
            columns: vec![ColumnSpec::new("id", "SERIAL PRIMARY KEY")],
        };
        assert_eq!(op.describe(), "Create table users (1 columns)");
    }

    // ── AddField ────────────────────────────────────────────────────

    #[test]
    fn test_add_field_sql() {
        let op = Operation::AddField {
            table: "users".into(),
            column: "bio".into(),
            definition: "TEXT".into(),
        };
        assert_eq!(op.statements(), vec!["ALTER TABLE users ADD COLUMN bio TEXT"]);
        assert_eq!(op.describe(), "Add field bio to users");
    }

    // ── AlterField ──────────────────────────────────────────────────

    #[test]
    fn test_alter_field_type_and_not_null() {
        let op = Operation::AlterField {
            table: "users".into(),
            column: "name".into(),
            definition: "VARCHAR(254) NOT NULL".into(),
        };
        let sqls = op.statements();
        assert_eq!(sqls.len(), 2);
        assert_eq!(
            sqls[0],
            "ALTER TABLE users ALTER COLUMN name TYPE VARCHAR(254) USING name::VARCHAR(254)"
        );
        assert_eq!(sqls[1], "ALTER TABLE users ALTER COLUMN name SET NOT NULL");
    }

    #[test]
    fn test_alter_field_nullable_drops_not_null() {
        let op = Operation::AlterField {
            table: "users".into(),
            column: "bio".into(),
            definition: "TEXT".into(),
        };
        let sqls = op.statements();
        assert_eq!(sqls[1], "ALTER TABLE users ALTER COLUMN bio DROP NOT NULL");
    }

    #[test]
    fn test_alter_field_unique_constraint_idempotent() {
        let op = Operation::AlterField {
            table: "users".into(),
            column: "email".into(),
            definition: "VARCHAR(254) UNIQUE NOT NULL".into(),
        };
        let sqls = op.statements();
        assert_eq!(sqls.len(), 4);
        assert_eq!(
            sqls[2],
            "ALTER TABLE users DROP CONSTRAINT IF EXISTS uq_users_email"
        );
        assert_eq!(
            sqls[3],
            "ALTER TABLE users ADD CONSTRAINT uq_users_email UNIQUE (email)"
        );
    }

    #[test]
    fn test_alter_field_serial_pk_is_noop() {
        let op = Operation::AlterField {
            table: "users".into(),
            column: "id".into(),
            definition: SERIAL_PRIMARY_KEY.into(),
        };
        assert!(op.statements().is_empty());
    }

    // ── RemoveField ─────────────────────────────────────────────────

    #[test]
    fn test_remove_field_sql() {
        let op = Operation::RemoveField {
            table: "users".into(),
            column: "legacy".into(),
        };
        assert_eq!(
            op.statements(),
            vec!["ALTER TABLE users DROP COLUMN IF EXISTS legacy CASCADE"]
        );
        assert_eq!(op.describe(), "Remove field legacy from users");
    }

    // ── RunSql ──────────────────────────────────────────────────────

    #[test]
    fn test_run_sql_verbatim() {
        let op = Operation::RunSql {
            statement: "UPDATE users SET name = trim(name)".into(),
        };
        assert_eq!(op.statements(), vec!["UPDATE users SET name = trim(name)"]);
        assert_eq!(op.describe(), "Run SQL");
    }

    // ── Serialization ───────────────────────────────────────────────

    #[test]
    fn test_serde_round_trip() {
        let op = Operation::AddField {
            table: "users".into(),
            column: "bio".into(),
            definition: "TEXT".into(),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"type\":\"AddField\""));
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
