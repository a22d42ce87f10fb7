//! Table index

use axum::{extract::State, response::Html};

use super::AdminState;
use crate::render::home::render_home;
use crate::Result;

/// GET `{root}` and `{root}/`
pub async fn index(State(state): State<AdminState>) -> Result<Html<String>> {
    let snapshot = state.snapshot().await;
    let catalog = snapshot.catalog()?;
    let body = render_home(state.root(), &catalog.links());
    Ok(state.page("Tables", None, &body))
}
