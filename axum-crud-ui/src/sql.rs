//! Parameterized statement assembly
//!
//! Every user-supplied value is bound as a parameter. Identifiers come from
//! the introspected schema (never from request input without validation) and
//! are quoted for the target dialect.

use std::collections::HashMap;

use crate::query_state::{QueryState, SearchOperator};
use crate::schema::{ColumnDescriptor, TableDescriptor};
use crate::{Error, Result};

/// Alias given to the subquery of a custom SQL table
const CUSTOM_SOURCE_ALIAS: &str = "custom_source";

/// SQL dialect of the connected database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    /// Quote an identifier (table or column name), doubling embedded quote characters
    pub fn quote_identifier(self, identifier: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", identifier.replace('`', "``")),
            Dialect::Sqlite | Dialect::Postgres => {
                format!("\"{}\"", identifier.replace('"', "\"\""))
            }
        }
    }

    /// Placeholder for the `index`-th (1-based) parameter
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    /// Expression comparing a column as text
    fn text_expression(self, quoted_column: &str) -> String {
        match self {
            Dialect::Postgres => format!("CAST({} AS TEXT)", quoted_column),
            Dialect::Sqlite | Dialect::MySql => quoted_column.to_string(),
        }
    }

    /// Expression assigning a text parameter to a column of `data_type`
    fn value_expression(self, placeholder: &str, data_type: &str) -> String {
        match self {
            Dialect::Postgres if !data_type.is_empty() => {
                format!("CAST({} AS {})", placeholder, data_type)
            }
            _ => placeholder.to_string(),
        }
    }
}

/// A bound parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
}

/// SQL text plus its parameters in binding order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// The row query and the matching count query of a list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub rows: Statement,
    pub count: Statement,
}

struct Builder {
    dialect: Dialect,
    sql: String,
    params: Vec<SqlValue>,
}

impl Builder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Register a parameter and return its placeholder
    fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    fn quote(&self, identifier: &str) -> String {
        self.dialect.quote_identifier(identifier)
    }

    fn finish(self) -> Statement {
        tracing::debug!(sql = %self.sql, params = self.params.len(), "built statement");
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// `FROM` target for reads: the table itself or the wrapped custom query
fn source(dialect: Dialect, table: &TableDescriptor) -> String {
    match &table.custom_sql {
        Some(custom) => format!(
            "({}) AS {}",
            trim_custom_sql(custom),
            dialect.quote_identifier(CUSTOM_SOURCE_ALIAS)
        ),
        None => dialect.quote_identifier(&table.name),
    }
}

/// Strip surrounding whitespace and trailing semicolons from a custom query
pub fn trim_custom_sql(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// Append the WHERE clause for search, date filter and advanced criteria
fn push_filters(builder: &mut Builder, table: &TableDescriptor, state: &QueryState) {
    let mut conditions: Vec<String> = Vec::new();

    if !state.search.is_empty() && !table.columns.is_empty() {
        let pattern = format!("%{}%", state.search);
        let matches: Vec<String> = table
            .columns
            .iter()
            .map(|column| {
                let expression = builder.dialect.text_expression(&builder.quote(&column.name));
                let placeholder = builder.bind(SqlValue::Text(pattern.clone()));
                format!("{} LIKE {}", expression, placeholder)
            })
            .collect();
        conditions.push(format!("({})", matches.join(" OR ")));
    }

    if let Some(filter) = &state.date_filter {
        let expression = builder
            .dialect
            .text_expression(&builder.quote(&filter.column));
        if let Some(from) = &filter.from {
            let placeholder = builder.bind(SqlValue::Text(from.clone()));
            conditions.push(format!("{} >= {}", expression, placeholder));
        }
        if let Some(to) = &filter.to {
            let placeholder = builder.bind(SqlValue::Text(format!("{} 23:59:59", to)));
            conditions.push(format!("{} <= {}", expression, placeholder));
        }
    }

    if !state.advanced.is_empty() {
        let criteria: Vec<String> = state
            .advanced
            .criteria
            .iter()
            .map(|criterion| {
                let expression = builder
                    .dialect
                    .text_expression(&builder.quote(&criterion.column));
                let (operator, value) = match criterion.operator {
                    SearchOperator::Contains => ("LIKE", format!("%{}%", criterion.value)),
                    SearchOperator::StartsWith => ("LIKE", format!("{}%", criterion.value)),
                    SearchOperator::EndsWith => ("LIKE", format!("%{}", criterion.value)),
                    SearchOperator::Equals => ("=", criterion.value.clone()),
                    SearchOperator::NotEquals => ("<>", criterion.value.clone()),
                    SearchOperator::GreaterThan => (">", criterion.value.clone()),
                    SearchOperator::LessThan => ("<", criterion.value.clone()),
                };
                let placeholder = builder.bind(SqlValue::Text(value));
                format!("{} {} {}", expression, operator, placeholder)
            })
            .collect();
        conditions.push(format!("({})", criteria.join(state.advanced.logic.as_sql())));
    }

    if !conditions.is_empty() {
        builder.push(" WHERE ");
        builder.push(&conditions.join(" AND "));
    }
}

fn push_order(builder: &mut Builder, state: &QueryState) {
    if state.sort.is_empty() {
        return;
    }
    let order = state
        .sort
        .iter()
        .map(|key| format!("{} {}", builder.quote(&key.column), key.direction.as_sql()))
        .collect::<Vec<_>>()
        .join(", ");
    builder.push(" ORDER BY ");
    builder.push(&order);
}

fn select_all(dialect: Dialect, table: &TableDescriptor, state: &QueryState) -> Builder {
    let mut builder = Builder::new(dialect);
    builder.push(&format!("SELECT * FROM {}", source(dialect, table)));
    push_filters(&mut builder, table, state);
    push_order(&mut builder, state);
    builder
}

/// Build the paginated row query and the count query for a list request
///
/// `state.page` is used as given; callers clamp it against the count first.
pub fn build_list_query(dialect: Dialect, table: &TableDescriptor, state: &QueryState) -> ListQuery {
    let mut rows = select_all(dialect, table, state);
    if let Some(page_size) = table.page_size {
        let offset = state.page.saturating_sub(1).saturating_mul(page_size);
        let limit = rows.bind(SqlValue::Integer(clamp_i64(page_size)));
        let offset = rows.bind(SqlValue::Integer(clamp_i64(offset)));
        rows.push(&format!(" LIMIT {} OFFSET {}", limit, offset));
    }

    ListQuery {
        rows: rows.finish(),
        count: build_count_query(dialect, table, state),
    }
}

/// `SELECT COUNT(*)` with the same filters as the row query
pub fn build_count_query(dialect: Dialect, table: &TableDescriptor, state: &QueryState) -> Statement {
    let mut count = Builder::new(dialect);
    count.push(&format!("SELECT COUNT(*) FROM {}", source(dialect, table)));
    push_filters(&mut count, table, state);
    count.finish()
}

/// Unpaginated row query used by the CSV export
pub fn build_export_query(dialect: Dialect, table: &TableDescriptor, state: &QueryState) -> Statement {
    select_all(dialect, table, state).finish()
}

fn key_column(table: &TableDescriptor) -> Result<&ColumnDescriptor> {
    table
        .primary_key()
        .ok_or_else(|| Error::NotFound(format!("table '{}' has no columns", table.name)))
}

fn ensure_writable(table: &TableDescriptor) -> Result<()> {
    if table.is_read_only() {
        return Err(Error::ReadOnly(table.name.clone()));
    }
    Ok(())
}

fn push_key_condition(builder: &mut Builder, key: &ColumnDescriptor, id: &str) {
    let expression = builder.dialect.text_expression(&builder.quote(&key.name));
    let placeholder = builder.bind(SqlValue::Text(id.to_string()));
    builder.push(&format!(" WHERE {} = {}", expression, placeholder));
}

/// Fetch one row by its key
pub fn build_select_by_key(dialect: Dialect, table: &TableDescriptor, id: &str) -> Result<Statement> {
    ensure_writable(table)?;
    let key = key_column(table)?;
    let mut builder = Builder::new(dialect);
    builder.push(&format!("SELECT * FROM {}", builder.quote(&table.name)));
    push_key_condition(&mut builder, key, id);
    Ok(builder.finish())
}

/// Convert a submitted form value for `column`
///
/// Absent fields become NULL; an empty value for a nullable non-text column
/// also becomes NULL so numbers and dates can be cleared from the form.
fn form_value(column: &ColumnDescriptor, submitted: Option<&String>) -> SqlValue {
    match submitted {
        None => SqlValue::Null,
        Some(value)
            if value.is_empty() && column.nullable && !column.type_family().is_textual() =>
        {
            SqlValue::Null
        }
        Some(value) => SqlValue::Text(value.clone()),
    }
}

fn assigned_value(builder: &mut Builder, column: &ColumnDescriptor, value: SqlValue) -> String {
    let placeholder = builder.bind(value);
    builder
        .dialect
        .value_expression(&placeholder, &column.data_type)
}

/// INSERT every column except the key from the submitted form
pub fn build_insert(
    dialect: Dialect,
    table: &TableDescriptor,
    form: &HashMap<String, String>,
) -> Result<Statement> {
    ensure_writable(table)?;
    key_column(table)?;

    let mut builder = Builder::new(dialect);
    let columns: Vec<&ColumnDescriptor> = table.writable_columns().collect();
    if columns.is_empty() {
        builder.push(&format!(
            "INSERT INTO {} DEFAULT VALUES",
            builder.quote(&table.name)
        ));
        return Ok(builder.finish());
    }

    let names = columns
        .iter()
        .map(|column| builder.quote(&column.name))
        .collect::<Vec<_>>()
        .join(", ");
    let values = columns
        .iter()
        .map(|column| {
            let value = form_value(column, form.get(&column.name));
            assigned_value(&mut builder, column, value)
        })
        .collect::<Vec<_>>()
        .join(", ");

    builder.push(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        builder.quote(&table.name),
        names,
        values
    ));
    Ok(builder.finish())
}

/// UPDATE every column except the key from the submitted form
pub fn build_update(
    dialect: Dialect,
    table: &TableDescriptor,
    id: &str,
    form: &HashMap<String, String>,
) -> Result<Statement> {
    ensure_writable(table)?;
    let key = key_column(table)?;
    let columns: Vec<&ColumnDescriptor> = table.writable_columns().collect();
    if columns.is_empty() {
        return Err(Error::UnknownColumn(format!(
            "table '{}' has no editable columns",
            table.name
        )));
    }

    let mut builder = Builder::new(dialect);
    let assignments = columns
        .iter()
        .map(|column| {
            let value = form_value(column, form.get(&column.name));
            let expression = assigned_value(&mut builder, column, value);
            format!("{} = {}", builder.quote(&column.name), expression)
        })
        .collect::<Vec<_>>()
        .join(", ");

    builder.push(&format!(
        "UPDATE {} SET {}",
        builder.quote(&table.name),
        assignments
    ));
    push_key_condition(&mut builder, key, id);
    Ok(builder.finish())
}

/// UPDATE a single field, rejecting names that are not editable columns
pub fn build_inline_update(
    dialect: Dialect,
    table: &TableDescriptor,
    id: &str,
    field: &str,
    value: &str,
) -> Result<Statement> {
    ensure_writable(table)?;
    let key = key_column(table)?;
    let column = table
        .writable_columns()
        .find(|column| column.name == field)
        .ok_or_else(|| Error::UnknownColumn(field.to_string()))?;

    let mut builder = Builder::new(dialect);
    let submitted = value.to_string();
    let expression = assigned_value(&mut builder, column, form_value(column, Some(&submitted)));
    builder.push(&format!(
        "UPDATE {} SET {} = {}",
        builder.quote(&table.name),
        builder.quote(&column.name),
        expression
    ));
    push_key_condition(&mut builder, key, id);
    Ok(builder.finish())
}

/// DELETE one row by its key
pub fn build_delete(dialect: Dialect, table: &TableDescriptor, id: &str) -> Result<Statement> {
    ensure_writable(table)?;
    let key = key_column(table)?;
    let mut builder = Builder::new(dialect);
    builder.push(&format!("DELETE FROM {}", builder.quote(&table.name)));
    push_key_condition(&mut builder, key, id);
    Ok(builder.finish())
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrudConfig;
    use crate::query_state::{
        AdvancedSearch, Criterion, DateFilter, ListParams, MatchLogic, SortDirection, SortKey,
    };
    use crate::schema::ColumnInfo;

    fn users() -> TableDescriptor {
        TableDescriptor::new(
            &CrudConfig::default(),
            "users",
            vec![
                ColumnInfo {
                    is_primary_key: true,
                    nullable: false,
                    ..ColumnInfo::new("id", "INTEGER")
                },
                ColumnInfo::new("email", "TEXT"),
                ColumnInfo::new("age", "INTEGER"),
            ],
        )
    }

    fn custom() -> TableDescriptor {
        let config = CrudConfig::from_yaml_str(
            "tables:\n  - name: stats\n    customSql: \"SELECT id, email FROM users;\"\n",
        )
        .unwrap();
        TableDescriptor::new(
            &config,
            "stats",
            vec![ColumnInfo::new("id", "INTEGER"), ColumnInfo::new("email", "TEXT")],
        )
    }

    fn state(table: &TableDescriptor) -> QueryState {
        QueryState::decode(&ListParams::default(), table)
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::Sqlite.quote_identifier("users"), "\"users\"");
        assert_eq!(
            Dialect::Postgres.quote_identifier("table\"name"),
            "\"table\"\"name\""
        );
        assert_eq!(Dialect::MySql.quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_list_query_plain() {
        let table = users();
        let query = build_list_query(Dialect::Sqlite, &table, &state(&table));

        assert_eq!(query.rows.sql, "SELECT * FROM \"users\" LIMIT ? OFFSET ?");
        assert_eq!(
            query.rows.params,
            vec![SqlValue::Integer(50), SqlValue::Integer(0)]
        );
        assert_eq!(query.count.sql, "SELECT COUNT(*) FROM \"users\"");
        assert!(query.count.params.is_empty());
    }

    #[test]
    fn test_list_query_search_spans_every_column() {
        let table = users();
        let mut current = state(&table);
        current.search = "al".to_string();
        current.sort = vec![
            SortKey {
                column: "id".to_string(),
                direction: SortDirection::Descending,
            },
            SortKey::ascending("email"),
        ];
        current.page = 2;

        let query = build_list_query(Dialect::MySql, &table, &current);
        assert_eq!(
            query.rows.sql,
            "SELECT * FROM `users` WHERE (`id` LIKE ? OR `email` LIKE ? OR `age` LIKE ?) \
             ORDER BY `id` DESC, `email` ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(query.rows.params.len(), 5);
        assert_eq!(query.rows.params[0], SqlValue::Text("%al%".to_string()));
        assert_eq!(query.rows.params[4], SqlValue::Integer(50));
        assert_eq!(
            query.count.sql,
            "SELECT COUNT(*) FROM `users` WHERE (`id` LIKE ? OR `email` LIKE ? OR `age` LIKE ?)"
        );
        assert_eq!(query.count.params.len(), 3);
    }

    #[test]
    fn test_postgres_numbering_and_casts() {
        let table = users();
        let mut current = state(&table);
        current.search = "7".to_string();

        let query = build_list_query(Dialect::Postgres, &table, &current);
        assert_eq!(
            query.rows.sql,
            "SELECT * FROM \"users\" WHERE (CAST(\"id\" AS TEXT) LIKE $1 OR \
             CAST(\"email\" AS TEXT) LIKE $2 OR CAST(\"age\" AS TEXT) LIKE $3) LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn test_date_and_advanced_filters() {
        let table = users();
        let mut current = state(&table);
        current.date_filter = Some(DateFilter {
            column: "age".to_string(),
            from: Some("2024-01-01".to_string()),
            to: Some("2024-01-31".to_string()),
        });
        current.advanced = AdvancedSearch {
            criteria: vec![
                Criterion {
                    column: "email".to_string(),
                    operator: SearchOperator::EndsWith,
                    value: "@example.com".to_string(),
                },
                Criterion {
                    column: "age".to_string(),
                    operator: SearchOperator::GreaterThan,
                    value: "30".to_string(),
                },
            ],
            logic: MatchLogic::Any,
        };

        let statement = build_count_query(Dialect::Sqlite, &table, &current);
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) FROM \"users\" WHERE \"age\" >= ? AND \"age\" <= ? \
             AND (\"email\" LIKE ? OR \"age\" > ?)"
        );
        assert_eq!(
            statement.params,
            vec![
                SqlValue::Text("2024-01-01".to_string()),
                SqlValue::Text("2024-01-31 23:59:59".to_string()),
                SqlValue::Text("%@example.com".to_string()),
                SqlValue::Text("30".to_string()),
            ]
        );
    }

    #[test]
    fn test_export_query_has_no_limit() {
        let table = users();
        let statement = build_export_query(Dialect::Sqlite, &table, &state(&table));
        assert_eq!(statement.sql, "SELECT * FROM \"users\"");
    }

    #[test]
    fn test_pagination_disabled_omits_limit() {
        let mut table = users();
        table.page_size = None;
        let query = build_list_query(Dialect::Sqlite, &table, &state(&table));
        assert_eq!(query.rows.sql, "SELECT * FROM \"users\"");
    }

    #[test]
    fn test_custom_source_is_wrapped_and_read_only() {
        let table = custom();
        let query = build_list_query(Dialect::Sqlite, &table, &state(&table));
        assert_eq!(
            query.rows.sql,
            "SELECT * FROM (SELECT id, email FROM users) AS \"custom_source\" LIMIT ? OFFSET ?"
        );

        assert!(matches!(
            build_insert(Dialect::Sqlite, &table, &HashMap::new()),
            Err(Error::ReadOnly(_))
        ));
        assert!(matches!(
            build_update(Dialect::Sqlite, &table, "1", &HashMap::new()),
            Err(Error::ReadOnly(_))
        ));
        assert!(matches!(
            build_delete(Dialect::Sqlite, &table, "1"),
            Err(Error::ReadOnly(_))
        ));
        assert!(matches!(
            build_inline_update(Dialect::Sqlite, &table, "1", "email", "x"),
            Err(Error::ReadOnly(_))
        ));
    }

    #[test]
    fn test_insert_skips_key_and_nulls_absent_fields() {
        let table = users();
        let statement = build_insert(
            Dialect::Sqlite,
            &table,
            &form(&[("id", "99"), ("email", "a@b.c")]),
        )
        .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO \"users\" (\"email\", \"age\") VALUES (?, ?)"
        );
        assert_eq!(
            statement.params,
            vec![SqlValue::Text("a@b.c".to_string()), SqlValue::Null]
        );
    }

    #[test]
    fn test_empty_value_for_nullable_number_is_null() {
        let table = users();
        let statement = build_insert(
            Dialect::Sqlite,
            &table,
            &form(&[("email", ""), ("age", "")]),
        )
        .unwrap();
        assert_eq!(
            statement.params,
            vec![SqlValue::Text(String::new()), SqlValue::Null]
        );
    }

    #[test]
    fn test_update_by_key() {
        let table = users();
        let statement = build_update(
            Dialect::Postgres,
            &table,
            "5",
            &form(&[("email", "x@y.z"), ("age", "41")]),
        )
        .unwrap();

        assert_eq!(
            statement.sql,
            "UPDATE \"users\" SET \"email\" = CAST($1 AS TEXT), \"age\" = CAST($2 AS INTEGER) \
             WHERE CAST(\"id\" AS TEXT) = $3"
        );
        assert_eq!(statement.params[2], SqlValue::Text("5".to_string()));
    }

    #[test]
    fn test_inline_update_validates_field() {
        let table = users();

        let statement = build_inline_update(Dialect::Sqlite, &table, "3", "email", "new@x.y").unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE \"users\" SET \"email\" = ? WHERE \"id\" = ?"
        );

        assert!(matches!(
            build_inline_update(Dialect::Sqlite, &table, "3", "email\" = 1; --", "x"),
            Err(Error::UnknownColumn(_))
        ));
        assert!(matches!(
            build_inline_update(Dialect::Sqlite, &table, "3", "id", "4"),
            Err(Error::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_select_and_delete_by_key() {
        let table = users();
        let select = build_select_by_key(Dialect::MySql, &table, "abc").unwrap();
        assert_eq!(select.sql, "SELECT * FROM `users` WHERE `id` = ?");
        assert_eq!(select.params, vec![SqlValue::Text("abc".to_string())]);

        let delete = build_delete(Dialect::Sqlite, &table, "abc").unwrap();
        assert_eq!(delete.sql, "DELETE FROM \"users\" WHERE \"id\" = ?");
    }

    #[test]
    fn test_trim_custom_sql() {
        assert_eq!(trim_custom_sql("  SELECT 1 ;  \n"), "SELECT 1");
    }
}
