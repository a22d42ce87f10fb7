//! MySQL / MariaDB database provider implementation

use crate::config::DatabaseSettings;
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::schema::{ColumnInfo, Row as RecordRow};
use crate::sql::{Dialect, SqlValue, Statement};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::Decimal;
use sqlx::{Column, Executor, MySqlPool, Row, Statement as _, TypeInfo, ValueRef};

/// MySQL database provider
pub struct MySqlProvider {
    pool: MySqlPool,
}

impl MySqlProvider {
    /// Create a new MySQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - MySQL connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Open a single-connection pool for the given settings
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DatabaseError> {
        let pool = crate::database::pool_options::<MySql>(settings)
            .connect(&settings.connection_url())
            .await
            .map_err(|error| DatabaseError::Connection(error.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Convert a MySQL row to a JSON object
    fn row_to_json(row: &MySqlRow) -> Result<RecordRow, DatabaseError> {
        let mut map = serde_json::Map::new();

        for column in row.columns() {
            let index = column.ordinal();
            if row.try_get_raw(index)?.is_null() {
                map.insert(column.name().to_string(), Value::Null);
                continue;
            }

            let type_name = column.type_info().name();
            let value = match type_name {
                "BOOLEAN" => Value::Bool(row.try_get(index)?),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                    Value::Number(row.try_get::<i64, _>(index)?.into())
                }
                "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED"
                | "INT UNSIGNED" | "BIGINT UNSIGNED" => {
                    Value::Number(row.try_get::<u64, _>(index)?.into())
                }
                "FLOAT" => float(row.try_get::<f32, _>(index)? as f64),
                "DOUBLE" => float(row.try_get::<f64, _>(index)?),
                "DECIMAL" => Value::String(row.try_get::<Decimal, _>(index)?.to_string()),
                "DATETIME" => Value::String(
                    row.try_get::<NaiveDateTime, _>(index)?
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                ),
                "TIMESTAMP" => Value::String(
                    row.try_get::<DateTime<Utc>, _>(index)?
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                ),
                "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
                // TIME can exceed a day in MySQL; fall back to the raw text
                "TIME" => match row.try_get::<NaiveTime, _>(index) {
                    Ok(time) => Value::String(time.format("%H:%M:%S").to_string()),
                    Err(_) => Value::String(text(row, index)?),
                },
                "JSON" => Value::String(row.try_get::<Value, _>(index)?.to_string()),
                "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                    let bytes: Vec<u8> = row.try_get(index)?;
                    Value::String(format!("[BLOB: {} bytes]", bytes.len()))
                }
                _ => Value::String(text(row, index)?),
            };

            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }
}

fn float(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Read a column as text, accepting binary collations
fn text(row: &MySqlRow, index: usize) -> Result<String, DatabaseError> {
    match row.try_get::<String, _>(index) {
        Ok(value) => Ok(value),
        Err(_) => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

/// Bind statement parameters in order
fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
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
impl DatabaseProvider for MySqlProvider {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
              AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter().map(|row| text(row, 0)).collect()
    }

    async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let column_query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(COLUMN_TYPE AS CHAR) AS column_type,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(COLUMN_KEY AS CHAR) AS column_key
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE()
              AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let column_rows = sqlx::query(column_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        let mut columns = Vec::with_capacity(column_rows.len());
        for row in &column_rows {
            let default_value = if row.try_get_raw(3)?.is_null() {
                None
            } else {
                Some(text(row, 3)?)
            };

            columns.push(ColumnInfo {
                name: text(row, 0)?,
                data_type: text(row, 1)?,
                nullable: text(row, 2)? == "YES",
                default_value,
                is_primary_key: text(row, 4)? == "PRI",
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
