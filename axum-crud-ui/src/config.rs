//! Static configuration
//!
//! The configuration is an immutable value: it is loaded once (usually from
//! YAML), merged with introspected schema into table descriptors, and replaced
//! as a whole when the database settings change at runtime.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Root configuration for the admin UI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrudConfig {
    /// Connection settings
    pub database: DatabaseSettings,

    /// Path prefix for every route (e.g. "/admin"); empty mounts at "/"
    pub root_path: String,

    /// Defaults applied to every table
    pub default_table: TableDefaults,

    /// Defaults applied to every column
    pub default_column: ColumnDefaults,

    /// Per-table overrides and custom SQL tables
    pub tables: Vec<TableConfig>,

    /// Feature flags
    pub features: Features,
}

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mysql,
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn default_port(self) -> Option<u16> {
        match self {
            Backend::Mysql => Some(3306),
            Backend::Postgres => Some(5432),
            Backend::Sqlite => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Mysql => "mysql",
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
        }
    }

    /// Parse a backend name as submitted by the configuration form
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Backend::Mysql),
            "postgres" | "postgresql" | "pg" => Some(Backend::Postgres),
            "sqlite" => Some(Backend::Sqlite),
            _ => None,
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    pub backend: Backend,
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,

    /// Database name, or the file path (or `:memory:`) for SQLite
    pub database: String,

    /// Pool size; the UI is designed around a single shared connection
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            host: "localhost".to_string(),
            port: None,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            max_connections: 1,
        }
    }
}

impl DatabaseSettings {
    /// Whether enough fields are present to attempt a connection
    pub fn is_complete(&self) -> bool {
        match self.backend {
            Backend::Sqlite => !self.database.trim().is_empty(),
            Backend::Mysql | Backend::Postgres => {
                !self.host.trim().is_empty()
                    && !self.user.trim().is_empty()
                    && !self.database.trim().is_empty()
            }
        }
    }

    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.backend.default_port())
    }

    /// Build a sqlx connection URL for these settings
    pub fn connection_url(&self) -> String {
        match self.backend {
            Backend::Sqlite => {
                if self.database == ":memory:" {
                    "sqlite::memory:".to_string()
                } else {
                    format!("sqlite:{}?mode=rwc", self.database)
                }
            }
            Backend::Mysql | Backend::Postgres => {
                let credentials = if self.password.is_empty() {
                    urlencoding::encode(&self.user).into_owned()
                } else {
                    format!(
                        "{}:{}",
                        urlencoding::encode(&self.user),
                        urlencoding::encode(&self.password)
                    )
                };
                let port = self
                    .effective_port()
                    .map(|port| format!(":{}", port))
                    .unwrap_or_default();
                format!(
                    "{}://{}@{}{}/{}",
                    self.backend.as_str(),
                    credentials,
                    self.host,
                    port,
                    urlencoding::encode(&self.database)
                )
            }
        }
    }
}

/// Pagination settings for a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationConfig {
    pub enabled: bool,
    pub page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: 50,
        }
    }
}

/// Defaults for every table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableDefaults {
    pub hidden: bool,
    pub pagination: PaginationConfig,
    pub instant_search: bool,
    pub advanced_search: bool,
    pub date_filters: bool,
    pub resizable_columns: bool,
    pub sortable_columns: bool,
    pub duplicate: bool,
}

impl Default for TableDefaults {
    fn default() -> Self {
        Self {
            hidden: false,
            pagination: PaginationConfig::default(),
            instant_search: true,
            advanced_search: true,
            date_filters: true,
            resizable_columns: true,
            sortable_columns: true,
            duplicate: true,
        }
    }
}

/// Defaults for every column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnDefaults {
    pub visible: bool,
    pub sortable: bool,
    pub searchable: bool,
    pub resizable: bool,
    pub render_view: Option<String>,
    pub render_edit: Option<String>,

    /// `None` infers the flag from the column type
    pub date_column: Option<bool>,
}

impl Default for ColumnDefaults {
    fn default() -> Self {
        Self {
            visible: true,
            sortable: true,
            searchable: true,
            resizable: true,
            render_view: None,
            render_edit: None,
            date_column: None,
        }
    }
}

/// Overrides for a single table, or the definition of a custom SQL table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub hidden: Option<bool>,

    /// Read-only subquery exposed as a virtual table
    pub custom_sql: Option<String>,
    pub pagination: Option<PaginationConfig>,
    pub instant_search: Option<bool>,
    pub advanced_search: Option<bool>,
    pub date_filters: Option<bool>,
    pub resizable_columns: Option<bool>,
    pub sortable_columns: Option<bool>,
    pub duplicate: Option<bool>,
    pub columns: Vec<ColumnConfig>,
}

/// Overrides for a single column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnConfig {
    pub name: String,
    pub visible: Option<bool>,
    pub sortable: Option<bool>,
    pub searchable: Option<bool>,
    pub resizable: Option<bool>,
    pub render_view: Option<String>,
    pub render_edit: Option<String>,
    pub date_column: Option<bool>,
}

/// Feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Features {
    /// Show the database configuration form instead of failing on connection errors
    #[serde(rename = "dbErrorUI", alias = "dbErrorUi")]
    pub db_error_ui: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self { db_error_ui: true }
    }
}

/// Table settings after merging defaults and overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub hidden: bool,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub custom_sql: Option<String>,
    pub pagination: PaginationConfig,
    pub instant_search: bool,
    pub advanced_search: bool,
    pub date_filters: bool,
    pub resizable_columns: bool,
    pub sortable_columns: bool,
    pub duplicate: bool,
}

/// Column settings after merging defaults and overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub visible: bool,
    pub sortable: bool,
    pub searchable: bool,
    pub resizable: bool,
    pub render_view: Option<String>,
    pub render_edit: Option<String>,
    pub date_column: Option<bool>,
}

impl CrudConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let config: CrudConfig =
            serde_yaml::from_str(source).map_err(|error| Error::Config(error.to_string()))?;
        Ok(config.normalized())
    }

    /// Load a YAML configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("{}: {}", path.display(), error)))?;
        Self::from_yaml_str(&source)
    }

    /// Normalize the root path to either "" or "/segment" without a trailing slash
    pub fn normalized(mut self) -> Self {
        let trimmed = self.root_path.trim().trim_end_matches('/');
        self.root_path = if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    /// Return a copy of this configuration with different database settings
    pub fn with_database(&self, database: DatabaseSettings) -> Self {
        Self {
            database,
            ..self.clone()
        }
    }

    pub fn table_override(&self, table: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|candidate| candidate.name == table)
    }

    /// Custom SQL tables declared in the configuration
    pub fn custom_tables(&self) -> impl Iterator<Item = &TableConfig> {
        self.tables.iter().filter(|table| table.custom_sql.is_some())
    }

    /// Merge `defaultTable` with the overrides for `table`
    pub fn table_config(&self, table: &str) -> ResolvedTable {
        let defaults = &self.default_table;
        let overrides = self.table_override(table);
        let pick = |value: Option<bool>, fallback: bool| value.unwrap_or(fallback);

        match overrides {
            Some(config) => ResolvedTable {
                hidden: pick(config.hidden, defaults.hidden),
                display_name: config.display_name.clone(),
                description: config.description.clone(),
                custom_sql: config.custom_sql.clone(),
                pagination: config.pagination.unwrap_or(defaults.pagination),
                instant_search: pick(config.instant_search, defaults.instant_search),
                advanced_search: pick(config.advanced_search, defaults.advanced_search),
                date_filters: pick(config.date_filters, defaults.date_filters),
                resizable_columns: pick(config.resizable_columns, defaults.resizable_columns),
                sortable_columns: pick(config.sortable_columns, defaults.sortable_columns),
                duplicate: pick(config.duplicate, defaults.duplicate),
            },
            None => ResolvedTable {
                hidden: defaults.hidden,
                display_name: None,
                description: None,
                custom_sql: None,
                pagination: defaults.pagination,
                instant_search: defaults.instant_search,
                advanced_search: defaults.advanced_search,
                date_filters: defaults.date_filters,
                resizable_columns: defaults.resizable_columns,
                sortable_columns: defaults.sortable_columns,
                duplicate: defaults.duplicate,
            },
        }
    }

    /// Merge `defaultColumn` with the overrides for `table.column`
    pub fn column_config(&self, table: &str, column: &str) -> ResolvedColumn {
        let defaults = &self.default_column;
        let overrides = self
            .table_override(table)
            .and_then(|config| config.columns.iter().find(|c| c.name == column));

        match overrides {
            Some(config) => ResolvedColumn {
                visible: config.visible.unwrap_or(defaults.visible),
                sortable: config.sortable.unwrap_or(defaults.sortable),
                searchable: config.searchable.unwrap_or(defaults.searchable),
                resizable: config.resizable.unwrap_or(defaults.resizable),
                render_view: config
                    .render_view
                    .clone()
                    .or_else(|| defaults.render_view.clone()),
                render_edit: config
                    .render_edit
                    .clone()
                    .or_else(|| defaults.render_edit.clone()),
                date_column: config.date_column.or(defaults.date_column),
            },
            None => ResolvedColumn {
                visible: defaults.visible,
                sortable: defaults.sortable,
                searchable: defaults.searchable,
                resizable: defaults.resizable,
                render_view: defaults.render_view.clone(),
                render_edit: defaults.render_edit.clone(),
                date_column: defaults.date_column,
            },
        }
    }
}
