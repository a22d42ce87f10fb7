//! Database configuration recovery

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use super::AdminState;
use crate::config::{Backend, DatabaseSettings};
use crate::render::home_url;

/// Fields of the configuration form; every field may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DbConfigForm {
    pub backend: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbConfigForm {
    /// Merge the submitted fields over `current`
    ///
    /// An unknown backend keeps the current one; an empty or invalid port
    /// falls back to the backend default.
    pub fn into_settings(self, current: &DatabaseSettings) -> DatabaseSettings {
        DatabaseSettings {
            backend: Backend::parse(&self.backend).unwrap_or(current.backend),
            host: self.host.trim().to_string(),
            port: self.port.trim().parse().ok(),
            user: self.user.trim().to_string(),
            password: self.password,
            database: self.database.trim().to_string(),
            max_connections: current.max_connections,
        }
    }
}

/// POST `{root}/db-config`
///
/// Tests the submitted settings and swaps in a new snapshot on success.
pub async fn submit(State(state): State<AdminState>, Form(form): Form<DbConfigForm>) -> Response {
    let current = state.snapshot().await.config.database.clone();
    let settings = form.into_settings(&current);

    match state.reconfigure(settings.clone()).await {
        Ok(()) => Redirect::to(&home_url(state.root())).into_response(),
        Err(error) => {
            tracing::warn!(
                backend = settings.backend.as_str(),
                %error,
                "database reconfiguration failed"
            );
            state
                .db_config_page(&settings, Some(&error.to_string()))
                .into_response()
        }
    }
}
