//! Database provider trait
//!
//! This trait defines the interface that all database implementations must provide.

use crate::schema::{ColumnInfo, Row};
use crate::sql::{Dialect, Statement};
use async_trait::async_trait;
use thiserror::Error;

/// Database provider trait for schema discovery and statement execution
///
/// Implementations introspect the schema and run statements produced by
/// [`crate::sql`]; they never assemble SQL from request input themselves.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// SQL dialect used to build statements for this provider
    fn dialect(&self) -> Dialect;

    /// Check that the connection is usable
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// List all base table names in the database, sorted by name
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError>;

    /// Get column metadata for a table, in declaration order
    ///
    /// # Arguments
    ///
    /// * `table` - Name of the table
    async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError>;

    /// Describe the result columns of an arbitrary query without running it
    async fn describe_query(&self, sql: &str) -> Result<Vec<ColumnInfo>, DatabaseError>;

    /// Run a statement and return every row
    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError>;

    /// Run a `SELECT COUNT(*)` statement
    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError>;

    /// Run a write statement and return the number of affected rows
    async fn execute(&self, statement: &Statement) -> Result<u64, DatabaseError>;
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Generic database error
    #[error("Database error: {0}")]
    Query(String),

    /// Could not connect with the given settings
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The backend was not compiled in
    #[error("Unsupported database backend: {0}")]
    Unsupported(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::Query(error.to_string())
    }
}
