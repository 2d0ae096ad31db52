//! Change detection: diffing registered models against the live schema.
//!
//! The [`Autodetector`] walks every registered model, computes its desired
//! column set through the type mapper, compares it against the
//! introspector's snapshot, and emits the operations needed to converge.
//! Implicit many-to-many junction tables are planned once, no matter how
//! many models declare the same through table.

use std::collections::BTreeSet;

use bedrock_core::{BedrockError, BedrockResult};
use bedrock_db::{FieldDef, FieldKind, ManyToMany, ModelRegistry};

use crate::column::{is_equal, SERIAL_PRIMARY_KEY};
use crate::introspect::SchemaIntrospector;
use crate::operations::{ColumnSpec, Operation};
use crate::typemap::desired_columns;

/// Diffs the model registry against the live schema.
pub struct Autodetector<'a> {
    registry: &'a ModelRegistry,
    introspector: &'a dyn SchemaIntrospector,
}

impl<'a> Autodetector<'a> {
    /// Creates a detector over the given registry and introspector.
    pub const fn new(registry: &'a ModelRegistry, introspector: &'a dyn SchemaIntrospector) -> Self {
        Self {
            registry,
            introspector,
        }
    }

    /// Computes the ordered operation list that converges the live schema
    /// to the registered models. An empty list signals a converged schema.
    ///
    /// Models are visited in table-name order, so the generated operations
    /// are reproducible between runs.
    ///
    /// # Errors
    ///
    /// Any introspection failure aborts detection entirely; no partial
    /// operation list is returned. Type-mapping failures surface as
    /// [`BedrockError::UnmappableType`].
    pub async fn changes(&self) -> BedrockResult<Vec<Operation>> {
        let mut existing: BTreeSet<String> = self
            .introspector
            .list_tables()
            .await?
            .into_iter()
            .collect();

        let mut operations = Vec::new();

        for (table, meta) in self.registry.all_models() {
            let desired = desired_columns(&meta.fields)?;

            if existing.contains(table) {
                let snapshot = self
                    .introspector
                    .table_snapshot(table)
                    .await?
                    .ok_or_else(|| {
                        BedrockError::Introspection(format!(
                            "Table '{table}' listed but no snapshot available"
                        ))
                    })?;

                for (column, definition) in &desired {
                    match snapshot.columns.get(column) {
                        None => operations.push(Operation::AddField {
                            table: table.clone(),
                            column: column.clone(),
                            definition: definition.clone(),
                        }),
                        Some(live) if !is_equal(definition, live) => {
                            tracing::debug!(
                                table = %table,
                                column = %column,
                                desired = %definition,
                                live = %live,
                                "column definition drift"
                            );
                            operations.push(Operation::AlterField {
                                table: table.clone(),
                                column: column.clone(),
                                definition: definition.clone(),
                            });
                        }
                        Some(_) => {}
                    }
                }

                for column in snapshot.columns.keys() {
                    if !desired.contains_key(column) {
                        operations.push(Operation::RemoveField {
                            table: table.clone(),
                            column: column.clone(),
                        });
                    }
                }
            } else {
                operations.push(Operation::CreateTable {
                    name: table.clone(),
                    columns: desired
                        .iter()
                        .map(|(name, definition)| ColumnSpec::new(name, definition))
                        .collect(),
                });
                existing.insert(table.clone());
            }

            for relation in many_to_many_relations(&meta.fields) {
                if existing.contains(&relation.through) {
                    continue;
                }
                operations.push(junction_table(relation));
                existing.insert(relation.through.clone());
            }
        }

        Ok(operations)
    }
}

/// All many-to-many relations declared on a field list, embedded structs
/// included.
fn many_to_many_relations(fields: &[FieldDef]) -> Vec<&ManyToMany> {
    let mut relations = Vec::new();
    for field in fields {
        if let FieldKind::Embedded { fields: inner } = &field.kind {
            relations.extend(many_to_many_relations(inner));
        }
        if let Some(relation) = &field.options.many_to_many {
            relations.push(relation);
        }
    }
    relations
}

/// Plans the junction table for a many-to-many relation: a serial primary
/// key plus two integer not-null foreign-key columns.
fn junction_table(relation: &ManyToMany) -> Operation {
    let from = relation.from_column.as_deref().unwrap_or("from_id");
    let to = relation.to_column.as_deref().unwrap_or("to_id");
    Operation::CreateTable {
        name: relation.through.clone(),
        columns: vec![
            ColumnSpec::new("id", SERIAL_PRIMARY_KEY),
            ColumnSpec::new(from, "INTEGER NOT NULL"),
            ColumnSpec::new(to, "INTEGER NOT NULL"),
        ],
    }
}
