//! Migration execution and the applied-migrations ledger.
//!
//! The [`Executor`] keeps a persisted ledger table with one row per applied
//! migration. Candidates are ordered by ID, already-recorded IDs are
//! skipped, and each migration's operations run strictly in declared order.
//! The first operation failure halts the whole batch: statements already
//! run inside the failing migration stay applied, no ledger row is written
//! for it, and earlier migrations remain recorded.

use std::collections::HashSet;

use bedrock_core::{logging::migration_span, BedrockError, BedrockResult};
use bedrock_db::{DatabaseBackend, Value};
use tracing::Instrument;

use crate::migration::Migration;

/// The name of the ledger table.
pub const LEDGER_TABLE: &str = "bedrock_migrations";

/// Applies migrations against a backend and records them in the ledger.
pub struct Executor<'a> {
    backend: &'a dyn DatabaseBackend,
}

impl<'a> Executor<'a> {
    /// Creates an executor over the given backend.
    pub const fn new(backend: &'a dyn DatabaseBackend) -> Self {
        Self { backend }
    }

    /// Ensures the ledger table exists. Idempotent.
    pub async fn setup(&self) -> BedrockResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (\
             name VARCHAR(255) UNIQUE NOT NULL, \
             applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        );
        self.backend.execute(&sql, &[]).await?;
        Ok(())
    }

    /// The IDs of all migrations recorded as applied.
    pub async fn applied(&self) -> BedrockResult<HashSet<String>> {
        let rows = self
            .backend
            .query(&format!("SELECT name FROM {LEDGER_TABLE}"), &[])
            .await?;
        rows.iter().map(|row| row.get::<String>("name")).collect()
    }

    /// Applies the pending migrations among `candidates`, in ID order.
    ///
    /// # Errors
    ///
    /// Returns the first operation error encountered. The failing
    /// migration is not recorded; migrations applied before it are.
    pub async fn migrate(&self, candidates: Vec<Migration>) -> BedrockResult<()> {
        self.setup().await?;
        let applied = self.applied().await?;

        let mut pending: Vec<Migration> = candidates
            .into_iter()
            .filter(|m| !applied.contains(&m.id))
            .collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));

        if pending.is_empty() {
            tracing::info!("no pending migrations");
            return Ok(());
        }

        for migration in &pending {
            self.apply_one(migration)
                .instrument(migration_span(&migration.id))
                .await?;
        }
        tracing::info!(count = pending.len(), "migrations applied");
        Ok(())
    }

    async fn apply_one(&self, migration: &Migration) -> BedrockResult<()> {
        tracing::info!(migration = %migration.describe(), "applying");

        for operation in &migration.operations {
            tracing::info!(operation = %operation.describe(), "running operation");
            operation.apply(self.backend).await.map_err(|err| {
                tracing::error!(
                    migration = %migration.id,
                    operation = %operation.describe(),
                    error = %err,
                    "operation failed, halting"
                );
                err
            })?;
        }

        self.record(&migration.id).await
    }

    /// Inserts the ledger row for an applied migration. The unique
    /// constraint on `name` is the idempotence guard of last resort.
    async fn record(&self, id: &str) -> BedrockResult<()> {
        let sql = format!("INSERT INTO {LEDGER_TABLE} (name) VALUES ($1)");
        self.backend
            .execute(&sql, &[Value::String(id.to_string())])
            .await
            .map_err(|err| {
                BedrockError::Migration(format!("Failed to record migration '{id}': {err}"))
            })?;
        Ok(())
    }
}
