//! Core error types for the bedrock migration engine.
//!
//! This module provides the [`BedrockError`] enum covering every failure
//! category the engine can surface: introspection failures, unmappable field
//! types, database statement errors, connectivity errors, migration-level
//! failures, and serialization errors.

use thiserror::Error;

/// The primary error type for the bedrock engine.
///
/// Every fallible API in the workspace returns this type. Variants carry
/// enough context (table, column, migration ID) to log meaningfully; there is
/// no automatic retry anywhere in the engine.
#[derive(Error, Debug)]
pub enum BedrockError {
    // ── Schema detection ─────────────────────────────────────────────

    /// Reading the live schema failed. Aborts change detection entirely;
    /// no partial operation list is ever returned.
    #[error("Introspection error: {0}")]
    Introspection(String),

    /// A declared field has a type the mapper does not recognize.
    ///
    /// The engine refuses to guess a storage type: silently degrading to
    /// TEXT would mis-declare the schema without anyone noticing.
    #[error("Cannot map field '{field}' of type '{kind}' to a SQL type")]
    UnmappableType {
        /// The field name as declared on the model.
        field: String,
        /// The unrecognized host type or type override.
        kind: String,
    },

    // ── Database ─────────────────────────────────────────────────────

    /// A SQL statement failed during execution.
    #[error("Database error: {0}")]
    Database(String),

    /// An operational failure: connection, pool, or configuration.
    #[error("Operational error: {0}")]
    Operational(String),

    // ── Migrations ───────────────────────────────────────────────────

    /// A migration-level failure (empty operation list, duplicate ID,
    /// malformed migration file).
    #[error("Migration error: {0}")]
    Migration(String),

    /// An error serializing or deserializing a migration file.
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred (reading or writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BedrockError {
    /// Returns `true` if this error came from reading the live schema.
    pub const fn is_introspection(&self) -> bool {
        matches!(self, Self::Introspection(_))
    }
}

/// A convenience type alias for `Result<T, BedrockError>`.
pub type BedrockResult<T> = Result<T, BedrockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_introspection() {
        let err = BedrockError::Introspection("connection refused".into());
        assert_eq!(err.to_string(), "Introspection error: connection refused");
        assert!(err.is_introspection());
    }

    #[test]
    fn test_display_unmappable_type() {
        let err = BedrockError::UnmappableType {
            field: "payload".into(),
            kind: "complex128".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot map field 'payload' of type 'complex128' to a SQL type"
        );
        assert!(!err.is_introspection());
    }

    #[test]
    fn test_display_database() {
        let err = BedrockError::Database("syntax error at or near".into());
        assert!(err.to_string().starts_with("Database error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BedrockError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }
}
