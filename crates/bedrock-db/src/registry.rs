//! The explicit model registry.
//!
//! Models are registered into a [`ModelRegistry`] during an explicit startup
//! phase and the registry handle is passed into the migration engine. A
//! `BTreeMap` keeps iteration ordered by table name so change detection and
//! generated migrations are reproducible between runs.

use std::collections::BTreeMap;

use crate::fields::FieldDef;

/// Metadata describing one registered model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelMeta {
    /// The database table name.
    pub table: String,
    /// The declared fields, in declaration order.
    pub fields: Vec<FieldDef>,
}

impl ModelMeta {
    /// Creates model metadata for the given table and fields.
    pub fn new(table: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }
}

/// Mapping from table name to model metadata.
///
/// Constructed and populated during startup; the migration engine only reads
/// it. Iteration over [`ModelRegistry::all_models`] is ordered by table name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelMeta>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model under its table name.
    ///
    /// Registering a second model with the same table name replaces the
    /// first.
    pub fn register(&mut self, meta: ModelMeta) {
        self.models.insert(meta.table.clone(), meta);
    }

    /// Looks up a model by table name.
    pub fn get(&self, table: &str) -> Option<&ModelMeta> {
        self.models.get(table)
    }

    /// All registered models, ordered by table name.
    pub fn all_models(&self) -> impl Iterator<Item = (&String, &ModelMeta)> {
        self.models.iter()
    }

    /// The number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no models are registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
