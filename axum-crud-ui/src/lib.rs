//! # axum-crud-ui
//!
//! A generic CRUD administration UI for relational databases, served as an Axum router.
//!
//! ## Features
//!
//! - Schema introspection for SQLite, PostgreSQL and MySQL
//! - Server-rendered list views with search, multi-column sort, column
//!   visibility, pagination, date filters and advanced search
//! - Create, edit, view, duplicate, delete and inline edit of rows
//! - Read-only "custom tables" defined by a SQL query
//! - CSV export of the current view
//! - A database configuration form when the initial connection fails
//!
//! ## Security Warning
//!
//! **There is no authentication or authorization built in.** Every exposed
//! table can be read and modified by anyone who can reach the router. Mount it
//! behind your own access control.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use axum_crud_ui::{CrudConfig, CrudUi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrudConfig::from_yaml_str(
//!         r#"
//! rootPath: /admin
//! database:
//!   backend: sqlite
//!   database: app.db
//! "#,
//!     )?;
//!
//!     let app = Router::new()
//!         .route("/", get(|| async { "Hello, World!" }))
//!         .merge(CrudUi::new(config).init().await?);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

// Public modules
pub mod catalog;
pub mod config;
pub mod database;
pub mod layer;
pub mod pagination;
pub mod query_state;
pub mod render;
pub mod renderers;
pub mod routes;
pub mod schema;
pub mod sql;

// Public exports
pub use catalog::Catalog;
pub use config::{Backend, CrudConfig, DatabaseSettings};
pub use layer::CrudUi;
pub use query_state::QueryState;
pub use renderers::{CellRenderer, RendererRegistry};
pub use schema::{ColumnDescriptor, ColumnInfo, Row, TableDescriptor};

// Re-export database providers
pub use database::traits::{DatabaseError, DatabaseProvider};

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
pub use database::postgres::PostgresProvider;

#[cfg(feature = "mysql")]
pub use database::mysql::MySqlProvider;

// Error type
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Database(#[from] DatabaseError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Table is read-only: {0}")]
    ReadOnly(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
