//! Database abstraction layer
//!
//! This module provides a database-agnostic interface for schema discovery
//! and statement execution, plus connection setup from [`DatabaseSettings`].

pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

use std::sync::Arc;

use crate::config::{Backend, DatabaseSettings};

// Re-export the main trait
pub use traits::{DatabaseError, DatabaseProvider};

/// Open a provider for the configured backend
///
/// The pool is capped at `settings.max_connections` (one by default) and keeps
/// its connection open for the life of the process.
pub async fn connect(
    settings: &DatabaseSettings,
) -> Result<Arc<dyn DatabaseProvider>, DatabaseError> {
    if !settings.is_complete() {
        return Err(DatabaseError::Connection(
            "Database configuration required".to_string(),
        ));
    }

    tracing::info!(
        backend = settings.backend.as_str(),
        host = %settings.host,
        database = %settings.database,
        "connecting to database"
    );

    let provider: Arc<dyn DatabaseProvider> = match settings.backend {
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Arc::new(sqlite::SqliteProvider::connect(settings).await?),
        #[cfg(feature = "postgres")]
        Backend::Postgres => Arc::new(postgres::PostgresProvider::connect(settings).await?),
        #[cfg(feature = "mysql")]
        Backend::Mysql => Arc::new(mysql::MySqlProvider::connect(settings).await?),
        #[allow(unreachable_patterns)]
        other => return Err(DatabaseError::Unsupported(other.as_str().to_string())),
    };

    provider.ping().await?;
    Ok(provider)
}

/// Pool options shared by every backend
pub(crate) fn pool_options<DB: sqlx::Database>(
    settings: &DatabaseSettings,
) -> sqlx::pool::PoolOptions<DB> {
    sqlx::pool::PoolOptions::<DB>::new()
        .max_connections(settings.max_connections.max(1))
        .idle_timeout(None)
        .max_lifetime(None)
}
