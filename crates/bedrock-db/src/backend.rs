//! Base database backend trait and connection configuration.
//!
//! This module defines the [`DatabaseBackend`] trait that backend
//! implementations must satisfy. The migration engine only ever talks to a
//! `dyn DatabaseBackend`, which is also what makes the engine testable with
//! an in-memory fake.

use bedrock_core::BedrockError;

use crate::row::Row;
use crate::value::Value;

/// The core trait for database backends.
///
/// All methods are async because database operations are inherently
/// I/O-bound. The migration engine issues plain SQL through this trait and
/// never inspects vendor-specific connection state.
#[async_trait::async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Returns the vendor name (e.g., "postgresql").
    fn vendor(&self) -> &str;

    /// Executes a SQL statement that does not return rows.
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, BedrockError>;

    /// Executes a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, BedrockError>;

    /// Executes a SQL query and returns exactly one row.
    ///
    /// # Errors
    ///
    /// Returns [`BedrockError::Database`] if zero or more than one row is
    /// returned.
    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row, BedrockError>;
}

/// Configuration for connecting to a database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// The database name.
    pub name: String,
    /// The database host.
    pub host: Option<String>,
    /// The database port.
    pub port: Option<u16>,
    /// The database user.
    pub user: Option<String>,
    /// The database password.
    pub password: Option<String>,
}

impl DatabaseConfig {
    /// Creates a configuration for a PostgreSQL database.
    pub fn postgres(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
            port: Some(port),
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }
}
