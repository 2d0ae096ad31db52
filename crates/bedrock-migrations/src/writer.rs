//! Persisting detected changes as replayable migrations.
//!
//! The [`MigrationWriter`] turns an operation list into a [`Migration`]
//! with a timestamp-based ID and registers it into an explicit
//! [`MigrationRegistry`] keyed by app label. This makes "detect changes"
//! and "persist as a replayable migration" two separate, composable steps.
//! A registry can also round-trip its migrations through JSON files on
//! disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bedrock_core::{BedrockError, BedrockResult};

use crate::migration::Migration;
use crate::operations::Operation;

/// Migrations grouped by app label, ordered by ID within each app.
///
/// Constructed and populated during an explicit startup phase, then passed
/// by reference into the executor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationRegistry {
    migrations: BTreeMap<String, Vec<Migration>>,
}

impl MigrationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a migration under its app label, keeping the app's list
    /// sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns [`BedrockError::Migration`] if the ID is already registered
    /// for that app.
    pub fn register(&mut self, migration: Migration) -> BedrockResult<()> {
        let entries = self
            .migrations
            .entry(migration.app_label.clone())
            .or_default();
        if entries.iter().any(|m| m.id == migration.id) {
            return Err(BedrockError::Migration(format!(
                "Duplicate migration id '{}' for app '{}'",
                migration.id, migration.app_label
            )));
        }
        entries.push(migration);
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(())
    }

    /// The migrations registered for one app, in ID order.
    pub fn for_app(&self, app_label: &str) -> &[Migration] {
        self.migrations.get(app_label).map_or(&[], Vec::as_slice)
    }

    /// All registered migrations across apps, in app then ID order.
    pub fn all(&self) -> Vec<Migration> {
        self.migrations.values().flatten().cloned().collect()
    }

    /// Loads every `*.json` migration file in a directory into the
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`BedrockError::Io`] on filesystem errors and
    /// [`BedrockError::Serialization`] on malformed files.
    pub fn load_dir(&mut self, dir: &Path) -> BedrockResult<usize> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let contents = std::fs::read_to_string(&path)?;
            let migration: Migration = serde_json::from_str(&contents).map_err(|err| {
                BedrockError::Serialization(format!(
                    "Malformed migration file {}: {err}",
                    path.display()
                ))
            })?;
            self.register(migration)?;
            loaded += 1;
        }
        Ok(loaded)
    }
}

/// Serializes operation lists into registered migrations.
pub struct MigrationWriter<'a> {
    registry: &'a mut MigrationRegistry,
    directory: Option<PathBuf>,
}

impl<'a> MigrationWriter<'a> {
    /// Creates a writer that only registers in memory.
    pub fn new(registry: &'a mut MigrationRegistry) -> Self {
        Self {
            registry,
            directory: None,
        }
    }

    /// Also persists each written migration as `<id>.json` in `dir`.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Writes the operations as a new migration and returns its ID.
    ///
    /// The ID is the current UTC time formatted as `%Y%m%d%H%M%S` plus the
    /// app label, so IDs sort lexicographically in creation order. When two
    /// writes for the same app land in the same second, the stamp is bumped
    /// until the ID is free, so the new ID still sorts after the existing
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`BedrockError::Migration`] if `operations` is empty.
    pub fn write(&mut self, app_label: &str, operations: Vec<Operation>) -> BedrockResult<String> {
        let mut stamp: u64 = chrono::Utc::now()
            .format("%Y%m%d%H%M%S")
            .to_string()
            .parse()
            .unwrap_or(0);
        let mut id = format!("{stamp}_{app_label}");
        while self
            .registry
            .for_app(app_label)
            .iter()
            .any(|m| m.id == id)
        {
            stamp += 1;
            id = format!("{stamp}_{app_label}");
        }
        self.write_with_id(app_label, &id, operations)
    }

    /// Writes the operations under an explicit ID.
    ///
    /// # Errors
    ///
    /// Returns [`BedrockError::Migration`] if `operations` is empty or the
    /// ID is already registered for that app.
    pub fn write_with_id(
        &mut self,
        app_label: &str,
        id: &str,
        operations: Vec<Operation>,
    ) -> BedrockResult<String> {
        if operations.is_empty() {
            return Err(BedrockError::Migration(format!(
                "Refusing to write an empty migration for app '{app_label}'"
            )));
        }

        let migration = Migration::new(id, app_label, operations);
        // Serialize up front, persist only after registration succeeds, so
        // a rejected duplicate leaves no orphan file behind.
        let pending_file = match &self.directory {
            Some(dir) => {
                let contents = serde_json::to_string_pretty(&migration).map_err(|err| {
                    BedrockError::Serialization(format!(
                        "Failed to serialize migration '{id}': {err}"
                    ))
                })?;
                Some((dir.join(format!("{id}.json")), contents))
            }
            None => None,
        };
        self.registry.register(migration)?;
        if let Some((path, contents)) = pending_file {
            std::fs::write(&path, contents)?;
            tracing::info!(path = %path.display(), "migration written");
        }
        tracing::info!(id = %id, app = %app_label, "migration registered");
        Ok(id.to_string())
    }
}
