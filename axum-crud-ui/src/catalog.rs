//! Table catalog
//!
//! A [`Catalog`] pairs a connected provider with the descriptors of every
//! table the UI exposes. It is built once per configuration and never
//! mutated; reconfiguration builds a new one.

use std::sync::Arc;

use crate::config::CrudConfig;
use crate::database::DatabaseProvider;
use crate::schema::{TableDescriptor, TableLink};
use crate::sql::trim_custom_sql;
use crate::Result;

/// Descriptors for all exposed tables plus the provider they were read from
pub struct Catalog {
    provider: Arc<dyn DatabaseProvider>,
    tables: Vec<TableDescriptor>,
}

impl Catalog {
    /// Introspect the database and merge the configuration over it
    ///
    /// Real tables come first in name order, followed by custom SQL tables in
    /// configuration order. Hidden tables are left out entirely.
    pub async fn load(provider: Arc<dyn DatabaseProvider>, config: &CrudConfig) -> Result<Self> {
        let mut tables = Vec::new();

        for name in provider.list_tables().await? {
            // A custom table may shadow a real one
            if config
                .table_override(&name)
                .is_some_and(|table| table.custom_sql.is_some())
            {
                continue;
            }
            let columns = provider.get_table_columns(&name).await?;
            let descriptor = TableDescriptor::new(config, &name, columns);
            if !descriptor.hidden {
                tables.push(descriptor);
            }
        }

        for custom in config.custom_tables() {
            let Some(sql) = custom.custom_sql.as_deref() else {
                continue;
            };
            match provider.describe_query(trim_custom_sql(sql)).await {
                Ok(columns) => {
                    let descriptor = TableDescriptor::new(config, &custom.name, columns);
                    if !descriptor.hidden {
                        tables.push(descriptor);
                    }
                }
                Err(error) => {
                    tracing::warn!(table = %custom.name, %error, "skipping custom table");
                }
            }
        }

        tracing::info!(tables = tables.len(), "catalog loaded");

        Ok(Self { provider, tables })
    }

    /// Connect with the configured settings, then [`Catalog::load`]
    pub async fn open(config: &CrudConfig) -> Result<Self> {
        let provider = crate::database::connect(&config.database).await?;
        Self::load(provider, config).await
    }

    pub fn provider(&self) -> &Arc<dyn DatabaseProvider> {
        &self.provider
    }

    /// Look up an exposed table by name
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    /// Links for the table index page
    pub fn links(&self) -> Vec<TableLink> {
        self.tables.iter().map(TableLink::from).collect()
    }
}
