//! PostgreSQL database provider implementation

use crate::config::DatabaseSettings;
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::schema::{ColumnInfo, Row as RecordRow};
use crate::sql::{Dialect, SqlValue, Statement};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, Uuid};
use sqlx::{Column, Executor, PgPool, Row, Statement as _, TypeInfo, ValueRef};

/// PostgreSQL database provider
pub struct PostgresProvider {
    pool: PgPool,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a single-connection pool for the given settings
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DatabaseError> {
        let pool = crate::database::pool_options::<Postgres>(settings)
            .connect(&settings.connection_url())
            .await
            .map_err(|error| DatabaseError::Connection(error.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Convert a PostgreSQL row to a JSON object
    fn row_to_json(row: &PgRow) -> Result<RecordRow, DatabaseError> {
        let mut map = serde_json::Map::new();

        for column in row.columns() {
            let index = column.ordinal();
            if row.try_get_raw(index)?.is_null() {
                map.insert(column.name().to_string(), Value::Null);
                continue;
            }

            let value = match column.type_info().name() {
                "BOOL" => Value::Bool(row.try_get(index)?),
                "INT2" => Value::Number(row.try_get::<i16, _>(index)?.into()),
                "INT4" => Value::Number(row.try_get::<i32, _>(index)?.into()),
                "INT8" => Value::Number(row.try_get::<i64, _>(index)?.into()),
                "FLOAT4" => float(row.try_get::<f32, _>(index)? as f64),
                "FLOAT8" => float(row.try_get::<f64, _>(index)?),
                // Keep the exact digits
                "NUMERIC" => Value::String(row.try_get::<Decimal, _>(index)?.to_string()),
                "BYTEA" => {
                    let bytes: Vec<u8> = row.try_get(index)?;
                    Value::String(format!("[BLOB: {} bytes]", bytes.len()))
                }
                "TIMESTAMP" => Value::String(
                    row.try_get::<NaiveDateTime, _>(index)?
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                ),
                "TIMESTAMPTZ" => Value::String(
                    row.try_get::<DateTime<Utc>, _>(index)?
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                ),
                "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
                "TIME" => Value::String(
                    row.try_get::<NaiveTime, _>(index)?
                        .format("%H:%M:%S")
                        .to_string(),
                ),
                "JSON" | "JSONB" => Value::String(row.try_get::<Value, _>(index)?.to_string()),
                "UUID" => Value::String(row.try_get::<Uuid, _>(index)?.to_string()),
                // Text-like and user-defined types
                _ => row
                    .try_get::<String, _>(index)
                    .map(Value::String)
                    .unwrap_or(Value::Null),
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

/// Bind statement parameters in order
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
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
impl DatabaseProvider for PostgresProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let query = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(DatabaseError::from))
            .collect()
    }

    async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let column_query = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default,
                udt_name::text AS udt_name
            FROM information_schema.columns
            WHERE table_schema = 'public'
              AND table_name = $1
            ORDER BY ordinal_position
        "#;

        let column_rows = sqlx::query(column_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        let pk_query = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = 'public'
              AND tc.table_name = $1
              AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
        "#;

        let primary_key_columns: Vec<String> = sqlx::query(pk_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("column_name"))
            .collect::<Result<Vec<_>, _>>()?;

        column_rows
            .iter()
            .map(|row| {
                let column_name: String = row.try_get("column_name")?;
                let data_type: String = row.try_get("data_type")?;
                let udt_name: String = row.try_get("udt_name")?;
                let is_nullable: String = row.try_get("is_nullable")?;
                let column_default: Option<String> = row.try_get("column_default")?;

                // Arrays and enums need the concrete type name for casts
                let data_type = match data_type.as_str() {
                    "USER-DEFINED" | "ARRAY" => udt_name,
                    _ => data_type,
                };

                Ok(ColumnInfo {
                    is_primary_key: primary_key_columns.contains(&column_name),
                    name: column_name,
                    data_type,
                    nullable: is_nullable == "YES",
                    default_value: column_default,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(DatabaseError::from)
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
