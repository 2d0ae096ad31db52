//! # bedrock-db
//!
//! Database substrate for the bedrock migration engine. Provides the
//! backend-agnostic [`Value`] enum, the generic [`Row`], the async
//! [`DatabaseBackend`] trait with its PostgreSQL implementation, the
//! declarative field metadata ([`FieldDef`], [`FieldKind`], [`FieldOptions`]),
//! and the explicit [`ModelRegistry`].
//!
//! ## Module Overview
//!
//! - [`value`] - The backend-agnostic [`Value`] enum
//! - [`row`] - The generic [`Row`] and [`FromValue`] conversion trait
//! - [`backend`] - The [`DatabaseBackend`] trait and [`DatabaseConfig`]
//! - [`postgres`] - [`PostgresBackend`] over `tokio-postgres`
//! - [`fields`] - [`FieldDef`] and friends: what a model declares
//! - [`registry`] - [`ModelRegistry`]: table name to model metadata

// Clippy overrides appropriate for a database substrate crate:
// FieldOptions mirrors a tag-based field API which uses many booleans, and
// some signatures intentionally take owned values for builder ergonomics.
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::use_self)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod fields;
pub mod postgres;
pub mod registry;
pub mod row;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use backend::{DatabaseBackend, DatabaseConfig};
pub use fields::{to_snake_case, FieldDef, FieldKind, FieldOptions, ManyToMany};
pub use postgres::PostgresBackend;
pub use registry::{ModelMeta, ModelRegistry};
pub use row::{FromValue, Row};
pub use value::Value;
