//! # bedrock-migrations
//!
//! The schema migration engine: keeps a running relational database schema
//! synchronized with a set of declarative model definitions.
//!
//! ## Module Overview
//!
//! - [`typemap`] - Field host type + options to normalized SQL column
//!   definitions
//! - [`column`] - Column-definition decomposition and semantic equality
//! - [`introspect`] - The [`SchemaIntrospector`] trait and its PostgreSQL
//!   implementation
//! - [`autodetect`] - The [`Autodetector`]: model registry vs. live schema
//! - [`operations`] - The closed [`Operation`] set (create/add/alter/remove
//!   /raw SQL)
//! - [`migration`] - The [`Migration`] unit
//! - [`executor`] - The [`Executor`] with its persisted applied-migrations
//!   ledger
//! - [`writer`] - The [`MigrationWriter`] and explicit [`MigrationRegistry`]
//!
//! ## Typical Flow
//!
//! ```text
//! ModelRegistry + SchemaIntrospector
//!     -> Autodetector::changes()
//!     -> Vec<Operation>
//!     -> MigrationWriter::write()   (persist as a replayable Migration)
//!     -> Executor::migrate()        (apply and record in the ledger)
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::use_self)]

pub mod autodetect;
pub mod column;
pub mod executor;
pub mod introspect;
pub mod migration;
pub mod operations;
pub mod typemap;
pub mod writer;

pub use autodetect::Autodetector;
pub use executor::{Executor, LEDGER_TABLE};
pub use introspect::{PostgresIntrospector, SchemaIntrospector, TableSnapshot};
pub use migration::Migration;
pub use operations::{ColumnSpec, Operation};
pub use writer::{MigrationRegistry, MigrationWriter};
