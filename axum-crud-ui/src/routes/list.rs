//! List view and CSV export

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};

use super::AdminState;
use crate::pagination::Pagination;
use crate::query_state::{ListParams, QueryState};
use crate::render::csv::render_csv;
use crate::render::grid::{render_list, ListView};
use crate::render::home_url;
use crate::sql::{build_count_query, build_export_query, build_list_query};
use crate::Result;

/// GET `{root}/{table}`
///
/// Renders one page of rows, or the whole filtered result as CSV when
/// `csv=1` is present.
pub async fn list(
    State(state): State<AdminState>,
    Path(table_name): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Response> {
    let snapshot = state.snapshot().await;
    let catalog = snapshot.catalog()?;
    let table = snapshot.table(&table_name)?;
    let provider = catalog.provider();
    let dialect = provider.dialect();

    let query_state = QueryState::decode(&params, table);

    if params.wants_csv() {
        let rows = provider
            .fetch_rows(&build_export_query(dialect, table, &query_state))
            .await?;
        let columns: Vec<&str> = query_state.visible_data_columns().collect();
        let body = render_csv(&columns, &rows);

        tracing::debug!(table = %table.name, rows = rows.len(), "exported csv");

        let disposition = format!(
            "attachment; filename=\"{}.csv\"",
            table.name.replace(['"', '\\'], "")
        );
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response());
    }

    let total = provider
        .fetch_count(&build_count_query(dialect, table, &query_state))
        .await?;
    let pagination = Pagination::new(query_state.page, table.page_size, total);
    let query_state = query_state.with_page(pagination.page);

    let query = build_list_query(dialect, table, &query_state);
    let rows = provider.fetch_rows(&query.rows).await?;

    let body = render_list(&ListView {
        root: state.root(),
        table,
        rows: &rows,
        state: &query_state,
        pagination: &pagination,
        renderers: state.renderers(),
    });

    Ok(state
        .page(&table.display_name, Some(&home_url(state.root())), &body)
        .into_response())
}
