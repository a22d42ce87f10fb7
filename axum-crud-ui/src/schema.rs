//! Schema types for dynamic database introspection
//!
//! `ColumnInfo` is what a provider discovers at runtime; `TableDescriptor` and
//! `ColumnDescriptor` are the same metadata merged with the static
//! configuration, which is what the rest of the crate works with.

use serde::{Deserialize, Serialize};

use crate::config::{CrudConfig, PaginationConfig};

/// A row as returned by the database driver, keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Synthetic column holding the View button
pub const VIEW_ACTION_COLUMN: &str = "__actions__";

/// Synthetic column holding the Edit and Delete buttons
pub const EDIT_ACTION_COLUMN: &str = "__editdelete__";

/// Both action columns in display order
pub const ACTION_COLUMNS: [&str; 2] = [VIEW_ACTION_COLUMN, EDIT_ACTION_COLUMN];

/// Information about a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// SQL data type (e.g., "INTEGER", "TEXT", "varchar(255)")
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Default value expression (if any)
    pub default_value: Option<String>,

    /// Whether the database reports this column as part of the primary key
    pub is_primary_key: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            is_primary_key: false,
        }
    }
}

/// Key role reported by introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Primary,
    None,
}

/// Broad classification of a declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Integer,
    Decimal,
    Date,
    DateTime,
    Time,
    Boolean,
    LongText,
    Text,
}

impl TypeFamily {
    /// Classify a declared type string such as `varchar(255)` or `TIMESTAMP WITH TIME ZONE`
    pub fn of(data_type: &str) -> Self {
        let lowered = data_type.to_ascii_lowercase();
        let base = lowered.split('(').next().unwrap_or("").trim();

        if base == "tinyint" && lowered.starts_with("tinyint(1)") {
            return TypeFamily::Boolean;
        }
        if base.starts_with("bool") {
            return TypeFamily::Boolean;
        }
        if (base.contains("int") && !base.starts_with("interval") && base != "point")
            || base.contains("serial")
        {
            return TypeFamily::Integer;
        }
        if ["decimal", "numeric", "real", "float", "double", "money"]
            .iter()
            .any(|family| base.contains(family))
        {
            return TypeFamily::Decimal;
        }
        if base.contains("timestamp") || base.contains("datetime") {
            return TypeFamily::DateTime;
        }
        if base == "date" {
            return TypeFamily::Date;
        }
        if base.starts_with("time") {
            return TypeFamily::Time;
        }
        if base == "text"
            || base.ends_with("text")
            || base == "clob"
            || base == "json"
            || base == "jsonb"
        {
            return TypeFamily::LongText;
        }
        TypeFamily::Text
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, TypeFamily::Date | TypeFamily::DateTime | TypeFamily::Time)
    }

    pub fn is_textual(self) -> bool {
        matches!(self, TypeFamily::Text | TypeFamily::LongText)
    }
}

/// A column merged with its configuration overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub key_role: KeyRole,
    pub visible: bool,
    pub sortable: bool,
    pub searchable: bool,
    pub resizable: bool,
    pub render_view: Option<String>,
    pub render_edit: Option<String>,
    pub date_column: bool,
}

impl ColumnDescriptor {
    /// Merge introspected metadata with the configuration for `table`
    pub fn from_info(config: &CrudConfig, table: &str, info: ColumnInfo) -> Self {
        let resolved = config.column_config(table, &info.name);
        let family = TypeFamily::of(&info.data_type);

        Self {
            date_column: resolved.date_column.unwrap_or(matches!(
                family,
                TypeFamily::Date | TypeFamily::DateTime
            )),
            key_role: if info.is_primary_key {
                KeyRole::Primary
            } else {
                KeyRole::None
            },
            name: info.name,
            data_type: info.data_type,
            nullable: info.nullable,
            visible: resolved.visible,
            sortable: resolved.sortable,
            searchable: resolved.searchable,
            resizable: resolved.resizable,
            render_view: resolved.render_view,
            render_edit: resolved.render_edit,
        }
    }

    pub fn type_family(&self) -> TypeFamily {
        TypeFamily::of(&self.data_type)
    }
}

/// Feature toggles for one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFeatures {
    pub instant_search: bool,
    pub advanced_search: bool,
    pub date_filters: bool,
    pub resizable_columns: bool,
    pub sortable_columns: bool,
    pub duplicate: bool,
}

/// A table (or custom SQL view) merged with its configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub hidden: bool,

    /// Read-only subquery backing a virtual table
    pub custom_sql: Option<String>,

    /// Rows per page, `None` when pagination is disabled
    pub page_size: Option<u64>,
    pub features: TableFeatures,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Build a descriptor from the configuration and introspected columns
    pub fn new(config: &CrudConfig, name: &str, columns: Vec<ColumnInfo>) -> Self {
        let resolved = config.table_config(name);
        let default_description = if resolved.custom_sql.is_some() {
            format!("Custom table: {}", name)
        } else {
            format!("Manage {} records", name)
        };

        Self {
            name: name.to_string(),
            display_name: resolved
                .display_name
                .unwrap_or_else(|| name.to_string()),
            description: resolved.description.unwrap_or(default_description),
            hidden: resolved.hidden,
            custom_sql: resolved.custom_sql,
            page_size: page_size(resolved.pagination),
            features: TableFeatures {
                instant_search: resolved.instant_search,
                advanced_search: resolved.advanced_search,
                date_filters: resolved.date_filters,
                resizable_columns: resolved.resizable_columns,
                sortable_columns: resolved.sortable_columns,
                duplicate: resolved.duplicate,
            },
            columns: columns
                .into_iter()
                .map(|info| ColumnDescriptor::from_info(config, name, info))
                .collect(),
        }
    }

    /// The key column used for every single-row operation (always the first column)
    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.columns.first()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn is_read_only(&self) -> bool {
        self.custom_sql.is_some()
    }

    /// Columns written by INSERT and UPDATE: everything except the key
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().skip(1)
    }

    pub fn date_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|column| column.date_column)
    }

    /// Extract the key value of `row` as a string
    pub fn row_key(&self, row: &Row) -> Option<String> {
        let key = self.primary_key()?;
        match row.get(&key.name) {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(value_to_string(value)),
        }
    }
}

fn page_size(pagination: PaginationConfig) -> Option<u64> {
    if pagination.enabled && pagination.page_size > 0 {
        Some(pagination.page_size)
    } else {
        None
    }
}

/// Display form of a scalar JSON value; NULL becomes the empty string
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Bool(flag) => flag.to_string(),
        serde_json::Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

/// Information about a table (for listing)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLink {
    pub name: String,
    pub display_name: String,
    pub description: String,
}

impl From<&TableDescriptor> for TableLink {
    fn from(table: &TableDescriptor) -> Self {
        Self {
            name: table.name.clone(),
            display_name: table.display_name.clone(),
            description: table.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo {
                is_primary_key: true,
                nullable: false,
                ..ColumnInfo::new("id", "INTEGER")
            },
            ColumnInfo::new("email", "varchar(255)"),
            ColumnInfo::new("created_at", "DATETIME"),
        ]
    }

    #[test]
    fn test_type_family() {
        assert_eq!(TypeFamily::of("INTEGER"), TypeFamily::Integer);
        assert_eq!(TypeFamily::of("bigint unsigned"), TypeFamily::Integer);
        assert_eq!(TypeFamily::of("tinyint(1)"), TypeFamily::Boolean);
        assert_eq!(TypeFamily::of("decimal(10,2)"), TypeFamily::Decimal);
        assert_eq!(TypeFamily::of("timestamp without time zone"), TypeFamily::DateTime);
        assert_eq!(TypeFamily::of("date"), TypeFamily::Date);
        assert_eq!(TypeFamily::of("time"), TypeFamily::Time);
        assert_eq!(TypeFamily::of("longtext"), TypeFamily::LongText);
        assert_eq!(TypeFamily::of("character varying"), TypeFamily::Text);
    }

    #[test]
    fn test_descriptor_defaults() {
        let config = CrudConfig::default();
        let table = TableDescriptor::new(&config, "users", users_columns());

        assert_eq!(table.display_name, "users");
        assert_eq!(table.description, "Manage users records");
        assert_eq!(table.page_size, Some(50));
        assert_eq!(table.primary_key().map(|c| c.name.as_str()), Some("id"));
        assert_eq!(table.primary_key().map(|c| c.key_role), Some(KeyRole::Primary));
        assert!(!table.is_read_only());

        let writable: Vec<_> = table.writable_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(writable, vec!["email", "created_at"]);

        let dates: Vec<_> = table.date_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(dates, vec!["created_at"]);
    }

    #[test]
    fn test_descriptor_overrides() {
        let config = CrudConfig::from_yaml_str(
            r#"
tables:
  - name: users
    displayName: People
    pagination:
      enabled: false
    columns:
      - name: created_at
        dateColumn: false
        visible: false
"#,
        )
        .unwrap();
        let table = TableDescriptor::new(&config, "users", users_columns());

        assert_eq!(table.display_name, "People");
        assert_eq!(table.page_size, None);
        let created = table.column("created_at").unwrap();
        assert!(!created.date_column);
        assert!(!created.visible);
    }

    #[test]
    fn test_row_key_and_value_to_string() {
        let config = CrudConfig::default();
        let table = TableDescriptor::new(&config, "users", users_columns());

        let mut row = Row::new();
        row.insert("id".to_string(), serde_json::json!(42));
        row.insert("email".to_string(), serde_json::Value::Null);

        assert_eq!(table.row_key(&row).as_deref(), Some("42"));
        assert_eq!(value_to_string(&row["email"]), "");
        assert_eq!(value_to_string(&serde_json::json!("text")), "text");
    }
}
