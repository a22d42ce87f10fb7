//! SQLite database provider implementation

use crate::config::DatabaseSettings;
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::schema::{ColumnInfo, Row as RecordRow};
use crate::sql::{Dialect, SqlValue, Statement};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Executor, Row, SqlitePool, Statement as _, TypeInfo, ValueRef};

/// SQLite database provider
pub struct SqliteProvider {
    pool: SqlitePool,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `pool` - SQLite connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a single-connection pool for the given settings
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DatabaseError> {
        let pool = crate::database::pool_options::<Sqlite>(settings)
            .connect(&settings.connection_url())
            .await
            .map_err(|error| DatabaseError::Connection(error.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Convert a SQLite row to a JSON object
    fn row_to_json(row: &SqliteRow) -> Result<RecordRow, DatabaseError> {
        let mut map = serde_json::Map::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column)?;
            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }

    /// Extract a column value from a SQLite row and convert to JSON
    fn extract_column_value(
        row: &SqliteRow,
        column: &sqlx::sqlite::SqliteColumn,
    ) -> Result<Value, DatabaseError> {
        let index = column.ordinal();

        // Check if the value is NULL first
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        // SQLite is dynamically typed; the value's storage class wins over the declared type
        let storage_class = raw.type_info().name().to_string();

        match storage_class.as_str() {
            "INTEGER" | "BIGINT" | "INT8" => {
                if let Ok(value) = row.try_get::<i64, _>(index) {
                    return Ok(Value::Number(value.into()));
                }
            }
            "REAL" | "FLOAT" | "DOUBLE" => {
                if let Ok(value) = row.try_get::<f64, _>(index) {
                    if let Some(number) = serde_json::Number::from_f64(value) {
                        return Ok(Value::Number(number));
                    }
                }
            }
            "BOOLEAN" | "BOOL" => {
                if let Ok(value) = row.try_get::<bool, _>(index) {
                    return Ok(Value::Bool(value));
                }
            }
            "BLOB" => {
                if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
                    return Ok(Value::String(format!("[BLOB: {} bytes]", value.len())));
                }
            }
            _ => {}
        }

        // Fallback: try common types in order
        if let Ok(value) = row.try_get::<String, _>(index) {
            return Ok(Value::String(value));
        }
        if let Ok(value) = row.try_get::<i64, _>(index) {
            return Ok(Value::Number(value.into()));
        }
        if let Ok(value) = row.try_get::<f64, _>(index) {
            if let Some(number) = serde_json::Number::from_f64(value) {
                return Ok(Value::Number(number));
            }
        }
        if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
            return Ok(Value::String(String::from_utf8_lossy(&value).into_owned()));
        }

        Ok(Value::Null)
    }
}

/// Bind statement parameters in order
fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(text) => query.bind(text.clone()),
            SqlValue::Integer(number) => query.bind(*number),
        };
    }
    query
}

#[async_trait]
impl DatabaseProvider for SqliteProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let query = "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(DatabaseError::from))
            .collect()
    }

    async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        // Get column information using PRAGMA table_info
        let table_info_query = format!(
            "PRAGMA table_info({})",
            Dialect::Sqlite.quote_identifier(table)
        );
        let column_rows = sqlx::query(&table_info_query)
            .fetch_all(&self.pool)
            .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        let mut columns = Vec::with_capacity(column_rows.len());
        for row in column_rows {
            // PRAGMA table_info returns: cid, name, type, notnull, dflt_value, pk
            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let not_null: i32 = row.try_get("notnull")?;
            let default_value: Option<String> = row.try_get("dflt_value").ok();
            let primary_key: i32 = row.try_get("pk")?;

            columns.push(ColumnInfo {
                name,
                data_type,
                nullable: not_null == 0 && primary_key == 0,
                default_value,
                is_primary_key: primary_key > 0,
            });
        }

        Ok(columns)
    }

    async fn describe_query(&self, sql: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let prepared = (&self.pool).prepare(sql).await?;
        Ok(prepared
            .columns()
            .iter()
            .map(|column| ColumnInfo::new(column.name(), column.type_info().name()))
            .collect())
    }

    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<RecordRow>, DatabaseError> {
        let rows = bind_params(sqlx::query(&statement.sql), &statement.params)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_json).collect()
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        let row = bind_params(sqlx::query(&statement.sql), &statement.params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        let result = bind_params(sqlx::query(&statement.sql), &statement.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;

    async fn provider() -> SqliteProvider {
        let settings = DatabaseSettings {
            backend: Backend::Sqlite,
            database: ":memory:".to_string(),
            ..DatabaseSettings::default()
        };
        let provider = SqliteProvider::connect(&settings).await.unwrap();
        sqlx::query(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL, score REAL, avatar BLOB)",
        )
        .execute(&provider.pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO users (email, score, avatar) VALUES ('a@example.com', 1.5, x'0102'), ('b@example.com', NULL, NULL)")
            .execute(&provider.pool)
            .await
            .unwrap();
        provider
    }

    #[tokio::test]
    async fn test_introspection() {
        let provider = provider().await;

        assert_eq!(provider.list_tables().await.unwrap(), vec!["users"]);

        let columns = provider.get_table_columns("users").await.unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "score", "avatar"]);
        assert!(columns[0].is_primary_key);
        assert!(!columns[1].nullable);
        assert!(columns[2].nullable);

        assert!(matches!(
            provider.get_table_columns("ghost").await,
            Err(DatabaseError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_describe_query() {
        let provider = provider().await;
        let columns = provider
            .describe_query("SELECT id, email AS contact FROM users")
            .await
            .unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "contact"]);
    }

    #[tokio::test]
    async fn test_fetch_and_execute() {
        let provider = provider().await;

        let rows = provider
            .fetch_rows(&Statement {
                sql: "SELECT * FROM users WHERE email LIKE ? ORDER BY id".to_string(),
                params: vec![SqlValue::Text("%example%".to_string())],
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], serde_json::json!(1));
        assert_eq!(rows[0]["score"], serde_json::json!(1.5));
        assert_eq!(rows[0]["avatar"], serde_json::json!("[BLOB: 2 bytes]"));
        assert_eq!(rows[1]["score"], Value::Null);

        let affected = provider
            .execute(&Statement {
                sql: "UPDATE users SET score = ? WHERE id = ?".to_string(),
                params: vec![SqlValue::Null, SqlValue::Text("1".to_string())],
            })
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let count = provider
            .fetch_count(&Statement {
                sql: "SELECT COUNT(*) FROM users WHERE score IS NULL".to_string(),
                params: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
