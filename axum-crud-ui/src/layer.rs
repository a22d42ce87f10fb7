//! CrudUi - Main Axum integration layer
//!
//! This module provides the main entry point for integrating axum-crud-ui
//! into an Axum application.

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::catalog::Catalog;
use crate::config::CrudConfig;
use crate::database::DatabaseProvider;
use crate::renderers::{CellRenderer, RendererRegistry};
use crate::routes::{build_router, AdminState, Snapshot};
use crate::Result;

/// Builder for the CRUD UI router
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_crud_ui::{CrudConfig, CrudUi};
///
/// # async fn example() -> axum_crud_ui::Result<()> {
/// let config = CrudConfig::from_path("crud-ui.yaml")?;
/// let admin = CrudUi::new(config).init().await?;
/// let app: Router = Router::new().merge(admin);
/// # Ok(())
/// # }
/// ```
pub struct CrudUi {
    config: CrudConfig,
    renderers: RendererRegistry,
}

impl CrudUi {
    /// Create a UI for `config` with the built-in cell renderers
    pub fn new(config: CrudConfig) -> Self {
        Self {
            config: config.normalized(),
            renderers: RendererRegistry::new(),
        }
    }

    /// Register a cell renderer under `name` for `renderView`/`renderEdit`
    pub fn with_renderer(mut self, name: impl Into<String>, renderer: impl CellRenderer) -> Self {
        self.renderers.register(name, renderer);
        self
    }

    /// Connect with the configured settings and build the router
    ///
    /// When the connection fails and `features.dbErrorUI` is on, the router
    /// starts in recovery mode and serves the database configuration form
    /// until working settings are submitted. Otherwise the error is returned.
    pub async fn init(self) -> Result<Router> {
        let snapshot = match Catalog::open(&self.config).await {
            Ok(catalog) => Snapshot::connected(self.config.clone(), catalog),
            Err(error) if self.config.features.db_error_ui => {
                tracing::warn!(%error, "database unavailable, serving configuration form");
                Snapshot::disconnected(self.config.clone(), error.to_string())
            }
            Err(error) => return Err(error),
        };
        Ok(self.into_router(snapshot))
    }

    /// Build the router over an already connected provider
    ///
    /// The configured database settings are kept for display only.
    pub async fn init_with(self, provider: Arc<dyn DatabaseProvider>) -> Result<Router> {
        let catalog = Catalog::load(provider, &self.config).await?;
        let snapshot = Snapshot::connected(self.config.clone(), catalog);
        Ok(self.into_router(snapshot))
    }

    fn into_router(self, snapshot: Snapshot) -> Router {
        let state = AdminState::new(snapshot, self.renderers);
        build_router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }
}
