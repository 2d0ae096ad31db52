//! The migration unit: a named, ordered list of operations.

use crate::operations::Operation;

/// A versioned, replayable unit of schema change.
///
/// Migrations are created by the writer or hand-authored, applied and
/// recorded by the executor, and never mutated after construction. The `id`
/// is lexicographically sortable; a timestamp-formatted ID sorts
/// chronologically. Dependencies are declared for documentation but the
/// executor orders by ID alone.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Migration {
    /// The stable, lexicographically sortable identifier.
    pub id: String,
    /// The application this migration belongs to.
    pub app_label: String,
    /// Declared migration IDs this one builds on. Stored, not enforced.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// The operations, applied strictly in declared order.
    pub operations: Vec<Operation>,
}

impl Migration {
    /// Creates a migration with no declared dependencies.
    pub fn new(
        id: impl Into<String>,
        app_label: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            id: id.into(),
            app_label: app_label.into(),
            dependencies: Vec::new(),
            operations,
        }
    }

    /// Sets the declared dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// A short summary for logs.
    pub fn describe(&self) -> String {
        format!(
            "{} ({}, {} operations)",
            self.id,
            self.app_label,
            self.operations.len()
        )
    }
}
