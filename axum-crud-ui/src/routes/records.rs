//! Single-record routes: new, edit, view, duplicate, delete and inline edit
//!
//! Every route here answers only for writable tables; custom SQL tables get
//! a 404 from [`Snapshot::writable_table`].

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form,
};
use serde::Deserialize;

use super::{AdminState, Snapshot};
use crate::catalog::Catalog;
use crate::render::form::{render_record_form, FormMode, RecordForm, RETURN_FIELD};
use crate::render::{record_url, table_url};
use crate::schema::{Row, TableDescriptor};
use crate::sql::{
    build_delete, build_inline_update, build_insert, build_select_by_key, build_update,
};
use crate::{Error, Result};

/// Body of `POST {root}/{table}/inline/{id}`
#[derive(Debug, Deserialize)]
pub struct InlineForm {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: String,
}

async fn fetch_record(catalog: &Catalog, table: &TableDescriptor, id: &str) -> Result<Row> {
    let provider = catalog.provider();
    let statement = build_select_by_key(provider.dialect(), table, id)?;
    provider
        .fetch_rows(&statement)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(format!("record '{}' in table '{}'", id, table.name)))
}

fn form_page(
    state: &AdminState,
    table: &TableDescriptor,
    mode: FormMode,
    id: Option<&str>,
    row: Option<&Row>,
) -> Html<String> {
    let body = render_record_form(&RecordForm {
        root: state.root(),
        table,
        mode,
        id,
        row,
        renderers: state.renderers(),
    });
    state.page(
        &mode.title(table),
        Some(&table_url(state.root(), &table.name)),
        &body,
    )
}

async fn save(
    snapshot: &Snapshot,
    table: &TableDescriptor,
    id: &str,
    form: &HashMap<String, String>,
) -> Result<()> {
    let provider = snapshot.catalog()?.provider();
    let statement = build_update(provider.dialect(), table, id, form)?;
    let affected = provider.execute(&statement).await?;
    tracing::debug!(table = %table.name, %id, affected, "record updated");
    Ok(())
}

/// GET `{root}/{table}/new`
pub async fn new_form(
    State(state): State<AdminState>,
    Path(table_name): Path<String>,
) -> Result<Html<String>> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    Ok(form_page(&state, table, FormMode::New, None, None))
}

/// POST `{root}/{table}/new`
pub async fn create(
    State(state): State<AdminState>,
    Path(table_name): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    let provider = snapshot.catalog()?.provider();

    let statement = build_insert(provider.dialect(), table, &form)?;
    provider.execute(&statement).await?;
    tracing::debug!(table = %table.name, "record created");

    Ok(Redirect::to(&table_url(state.root(), &table.name)))
}

/// GET `{root}/{table}/edit/{id}`
pub async fn edit_form(
    State(state): State<AdminState>,
    Path((table_name, id)): Path<(String, String)>,
) -> Result<Html<String>> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    let row = fetch_record(snapshot.catalog()?, table, &id).await?;
    Ok(form_page(&state, table, FormMode::Edit, Some(&id), Some(&row)))
}

/// POST `{root}/{table}/edit/{id}`
///
/// Returns to the view page when the form came from it, else to the list.
pub async fn update(
    State(state): State<AdminState>,
    Path((table_name, id)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    save(&snapshot, table, &id, &form).await?;

    let target = if form.get(RETURN_FIELD).map(String::as_str) == Some("view") {
        record_url(state.root(), &table.name, "view", &id)
    } else {
        table_url(state.root(), &table.name)
    };
    Ok(Redirect::to(&target))
}

/// GET `{root}/{table}/view/{id}`
pub async fn view(
    State(state): State<AdminState>,
    Path((table_name, id)): Path<(String, String)>,
) -> Result<Html<String>> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    let row = fetch_record(snapshot.catalog()?, table, &id).await?;
    Ok(form_page(&state, table, FormMode::View, Some(&id), Some(&row)))
}

/// POST `{root}/{table}/view/{id}`
pub async fn update_from_view(
    State(state): State<AdminState>,
    Path((table_name, id)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    save(&snapshot, table, &id, &form).await?;
    Ok(Redirect::to(&record_url(state.root(), &table.name, "view", &id)))
}

/// GET `{root}/{table}/duplicate/{id}`
pub async fn duplicate(
    State(state): State<AdminState>,
    Path((table_name, id)): Path<(String, String)>,
) -> Result<Html<String>> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    if !table.features.duplicate {
        return Err(Error::NotFound(format!(
            "duplicate is disabled for table '{}'",
            table.name
        )));
    }
    let row = fetch_record(snapshot.catalog()?, table, &id).await?;
    Ok(form_page(&state, table, FormMode::Duplicate, Some(&id), Some(&row)))
}

/// POST `{root}/{table}/delete/{id}`
pub async fn delete(
    State(state): State<AdminState>,
    Path((table_name, id)): Path<(String, String)>,
) -> Result<Redirect> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    let provider = snapshot.catalog()?.provider();

    let statement = build_delete(provider.dialect(), table, &id)?;
    let affected = provider.execute(&statement).await?;
    tracing::debug!(table = %table.name, %id, affected, "record deleted");

    Ok(Redirect::to(&table_url(state.root(), &table.name)))
}

/// POST `{root}/{table}/inline/{id}`
///
/// Updates one field; names that are not editable columns are a 400.
pub async fn inline_update(
    State(state): State<AdminState>,
    Path((table_name, id)): Path<(String, String)>,
    Form(form): Form<InlineForm>,
) -> Result<Redirect> {
    let snapshot = state.snapshot().await;
    let table = snapshot.writable_table(&table_name)?;
    let provider = snapshot.catalog()?.provider();

    let statement = build_inline_update(provider.dialect(), table, &id, &form.field, &form.value)?;
    let affected = provider.execute(&statement).await?;
    tracing::debug!(table = %table.name, %id, field = %form.field, affected, "inline update");

    Ok(Redirect::to(&table_url(state.root(), &table.name)))
}
