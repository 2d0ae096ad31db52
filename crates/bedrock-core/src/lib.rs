//! # bedrock-core
//!
//! Shared foundation for the bedrock migration engine: the [`BedrockError`]
//! taxonomy used by every other crate, and `tracing`-based logging setup.

#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod logging;

pub use error::{BedrockError, BedrockResult};
pub use logging::{migration_span, setup_logging};
