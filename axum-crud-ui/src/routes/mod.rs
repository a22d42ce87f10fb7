//! HTTP routes
//!
//! One generic set of routes serves every table: handlers resolve the
//! `{table}` segment through the current [`Snapshot`], so swapping the
//! snapshot after reconfiguration never requires rebuilding the router.

pub mod assets;
pub mod db_config;
pub mod error;
pub mod home;
pub mod list;
pub mod records;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{StatusCode, Uri},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::config::{CrudConfig, DatabaseSettings};
use crate::database::DatabaseError;
use crate::render::{self, db_config::render_db_config};
use crate::renderers::RendererRegistry;
use crate::schema::TableDescriptor;
use crate::{Error, Result};

/// Configuration and catalog in use, replaced as a whole on reconfiguration
pub struct Snapshot {
    pub config: CrudConfig,

    /// `None` while waiting for working database settings
    pub catalog: Option<Catalog>,

    /// Why the last connection attempt failed
    pub connection_error: Option<String>,
}

impl Snapshot {
    pub fn connected(config: CrudConfig, catalog: Catalog) -> Self {
        Self {
            config,
            catalog: Some(catalog),
            connection_error: None,
        }
    }

    pub fn disconnected(config: CrudConfig, error: impl Into<String>) -> Self {
        Self {
            config,
            catalog: None,
            connection_error: Some(error.into()),
        }
    }

    pub fn catalog(&self) -> Result<&Catalog> {
        self.catalog.as_ref().ok_or_else(|| {
            Error::Database(DatabaseError::Connection(
                "Database configuration required".to_string(),
            ))
        })
    }

    /// A table that answers the list route
    pub fn table(&self, name: &str) -> Result<&TableDescriptor> {
        self.catalog()?
            .table(name)
            .ok_or_else(|| Error::NotFound(format!("table '{}'", name)))
    }

    /// A table that answers the record routes; custom SQL tables do not
    pub fn writable_table(&self, name: &str) -> Result<&TableDescriptor> {
        let table = self.table(name)?;
        if table.is_read_only() {
            return Err(Error::NotFound(format!("table '{}' is read-only", name)));
        }
        Ok(table)
    }
}

struct Shared {
    root: String,
    renderers: RendererRegistry,
    snapshot: RwLock<Arc<Snapshot>>,
}

/// State shared by every handler
#[derive(Clone)]
pub struct AdminState {
    shared: Arc<Shared>,
}

impl AdminState {
    pub fn new(snapshot: Snapshot, renderers: RendererRegistry) -> Self {
        Self {
            shared: Arc::new(Shared {
                root: snapshot.config.root_path.clone(),
                renderers,
                snapshot: RwLock::new(Arc::new(snapshot)),
            }),
        }
    }

    /// Root path the routes are mounted under ("" or "/segment")
    pub fn root(&self) -> &str {
        &self.shared.root
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.shared.renderers
    }

    /// The current snapshot; the lock is released before returning
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.snapshot.read().await.clone()
    }

    /// Connect with `settings` and, on success, swap in a new snapshot
    ///
    /// The current snapshot stays in place when connecting or loading fails.
    pub async fn reconfigure(&self, settings: DatabaseSettings) -> Result<()> {
        let config = self.snapshot().await.config.with_database(settings);
        let catalog = Catalog::open(&config).await?;

        tracing::info!(
            backend = config.database.backend.as_str(),
            database = %config.database.database,
            "database reconfigured"
        );
        *self.shared.snapshot.write().await = Arc::new(Snapshot::connected(config, catalog));
        Ok(())
    }

    /// Wrap `body` in the page shell
    pub fn page(&self, title: &str, back: Option<&str>, body: &str) -> Html<String> {
        Html(render::page(self.root(), title, back, body))
    }

    /// Configuration form for `settings`
    pub fn db_config_page(&self, settings: &DatabaseSettings, error: Option<&str>) -> Html<String> {
        self.page(
            render::db_config::TITLE,
            None,
            &render_db_config(self.root(), settings, error),
        )
    }
}

/// Build the router for every route under the root path
pub fn build_router(state: AdminState) -> Router {
    let root = state.root().to_string();
    let path = |suffix: &str| format!("{}{}", root, suffix);

    let mut router = Router::new().route(&render::home_url(&root), get(home::index));
    if !root.is_empty() {
        router = router.route(&path("/"), get(home::index));
    }

    // Note: Axum 0.8 uses {param} syntax; static segments win over {table}
    router
        .route(&path("/db-config"), post(db_config::submit))
        .route(&path("/assets/{*path}"), get(assets::serve_asset))
        .route(&path("/{table}"), get(list::list))
        .route(
            &path("/{table}/new"),
            get(records::new_form).post(records::create),
        )
        .route(
            &path("/{table}/edit/{id}"),
            get(records::edit_form).post(records::update),
        )
        .route(
            &path("/{table}/view/{id}"),
            get(records::view).post(records::update_from_view),
        )
        .route(&path("/{table}/duplicate/{id}"), get(records::duplicate))
        .route(&path("/{table}/delete/{id}"), post(records::delete))
        .route(&path("/{table}/inline/{id}"), post(records::inline_update))
        .route_layer(middleware::from_fn_with_state(state.clone(), page_guard))
        .fallback(unmatched)
        .with_state(state)
}

/// Paths under the root that no route matches get the same treatment as
/// routed pages; anything outside the root is left to the host application
async fn unmatched(State(state): State<AdminState>, uri: Uri) -> Response {
    let root = state.root();
    let path = uri.path();
    let under_root = root.is_empty() || path == root || path.starts_with(&format!("{}/", root));
    if !under_root {
        return StatusCode::NOT_FOUND.into_response();
    }

    let snapshot = state.snapshot().await;
    if snapshot.catalog.is_none() {
        return state
            .db_config_page(
                &snapshot.config.database,
                snapshot.connection_error.as_deref(),
            )
            .into_response();
    }

    tracing::debug!(path, "no route matched");
    let message = format!("page '{}' not found", path);
    (
        StatusCode::NOT_FOUND,
        Html(render::error_page(root, "Not Found", &message)),
    )
        .into_response()
}

/// Serve the configuration form while disconnected and give error
/// responses the full page shell
async fn page_guard(State(state): State<AdminState>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let exempt = path == format!("{}/db-config", state.root())
        || path.starts_with(&format!("{}/assets/", state.root()));

    if !exempt {
        let snapshot = state.snapshot().await;
        if snapshot.catalog.is_none() {
            return state
                .db_config_page(
                    &snapshot.config.database,
                    snapshot.connection_error.as_deref(),
                )
                .into_response();
        }
    }

    let response = next.run(request).await;
    match response.extensions().get::<error::ErrorDetails>().cloned() {
        Some(details) if !state.root().is_empty() => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(axum::http::header::CONTENT_LENGTH);
            let body = render::error_page(state.root(), details.title, &details.message);
            Response::from_parts(parts, Body::from(body))
        }
        _ => response,
    }
}
