//! List view: controls, filter panels, the table grid and pagination

use serde_json::Value;

use super::form::edit_control;
use super::{escape_html, record_url, table_url, truncate};
use crate::pagination::{PageLink, Pagination};
use crate::query_state::{AdvancedSearch, Criterion, QueryState, SearchOperator, SortDirection};
use crate::renderers::RendererRegistry;
use crate::schema::{
    value_to_string, ColumnDescriptor, Row, TableDescriptor, EDIT_ACTION_COLUMN,
    VIEW_ACTION_COLUMN,
};

/// Everything the list page needs
pub struct ListView<'a> {
    pub root: &'a str,
    pub table: &'a TableDescriptor,
    pub rows: &'a [Row],
    pub state: &'a QueryState,
    pub pagination: &'a Pagination,
    pub renderers: &'a RendererRegistry,
}

/// Render the whole list page body
pub fn render_list(view: &ListView<'_>) -> String {
    let mut html = view.controls();
    if view.table.features.advanced_search {
        html.push_str(&view.advanced_search_panel());
    }
    if view.table.features.date_filters && view.table.date_columns().next().is_some() {
        html.push_str(&view.date_filter_panel());
    }
    html.push_str(&view.grid());
    html.push_str(&view.pagination_controls());
    html
}

fn hidden_input(name: &str, value: &str) -> String {
    format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        name,
        escape_html(value)
    )
}

impl ListView<'_> {
    fn writable(&self) -> bool {
        !self.table.is_read_only()
    }

    fn url(&self, state: &QueryState) -> String {
        state.encode(self.root, &self.table.name)
    }

    fn visible_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.table
            .columns
            .iter()
            .filter(|column| self.state.is_visible(&column.name))
    }

    fn controls(&self) -> String {
        let checkboxes: String = self
            .table
            .columns
            .iter()
            .map(|column| {
                format!(
                    r#"<label><input type="checkbox" class="col-checkbox" value="{name}"{checked}> {name}</label>"#,
                    name = escape_html(&column.name),
                    checked = if self.state.is_visible(&column.name) {
                        " checked"
                    } else {
                        ""
                    },
                )
            })
            .collect();

        let mut left = format!(
            r#"<div class="columns-dropdown" id="columns-dropdown">
                <button type="button" class="btn columns-toggle">Columns</button>
                <div class="panel">{}</div>
            </div>
            <a class="btn csv-btn" id="csv-link" href="{}">Export CSV</a>"#,
            checkboxes,
            escape_html(&self.state.encode_csv(self.root, &self.table.name)),
        );
        if self.writable() {
            left.push_str(
                r#"
            <button type="button" class="btn toggle-inline-btn">Inline Edit</button>
            <button type="button" class="btn save-inline-btn" hidden>Save Changes</button>"#,
            );
        }
        if self.table.features.advanced_search {
            left.push_str(
                r#"
            <button type="button" class="btn panel-toggle" data-target="advanced-search">Advanced Search</button>"#,
            );
        }
        if self.table.features.date_filters && self.table.date_columns().next().is_some() {
            left.push_str(
                r#"
            <button type="button" class="btn panel-toggle" data-target="date-filter">Date Filter</button>"#,
            );
        }

        // The search form carries the rest of the state so Enter keeps it
        let mut carried = String::new();
        if !self.state.sort.is_empty() {
            carried.push_str(&hidden_input("sort", &self.state.sort_token()));
        }
        carried.push_str(&hidden_input("visible", &self.state.visible_token()));
        if let Some(filter) = &self.state.date_filter {
            carried.push_str(&hidden_input(
                "date",
                &format!(
                    "{},{},{}",
                    filter.column,
                    filter.from.as_deref().unwrap_or(""),
                    filter.to.as_deref().unwrap_or("")
                ),
            ));
        }
        if !self.state.advanced.is_empty() {
            carried.push_str(&hidden_input("adv", &self.state.advanced_token()));
            carried.push_str(&hidden_input("match", self.state.advanced.logic.as_token()));
        }

        let new_button = if self.writable() {
            format!(
                r#"<a class="btn btn-primary new-btn" href="{}/new">New</a>"#,
                escape_html(&table_url(self.root, &self.table.name))
            )
        } else {
            String::new()
        };

        format!(
            r#"
    <div class="controls-row">
        <div class="controls-left">
            {left}
        </div>
        <div class="controls-right">
            <form method="GET" action="{action}" class="search-form">
                {carried}
                <input type="search" id="search-box" name="search" class="search-input" placeholder="Search..." value="{search}" data-instant="{instant}">
            </form>
            {new_button}
        </div>
    </div>"#,
            left = left,
            action = escape_html(&table_url(self.root, &self.table.name)),
            carried = carried,
            search = escape_html(&self.state.search),
            instant = self.table.features.instant_search,
            new_button = new_button,
        )
    }

    fn column_options(&self, selected: Option<&str>) -> String {
        self.table
            .columns
            .iter()
            .filter(|column| column.searchable)
            .map(|column| {
                format!(
                    r#"<option value="{name}"{selected}>{name}</option>"#,
                    name = escape_html(&column.name),
                    selected = if selected == Some(column.name.as_str()) {
                        " selected"
                    } else {
                        ""
                    },
                )
            })
            .collect()
    }

    fn criterion_row(&self, criterion: Option<&Criterion>) -> String {
        let operators: String = SearchOperator::ALL
            .into_iter()
            .map(|operator| {
                format!(
                    r#"<option value="{}"{}>{}</option>"#,
                    operator.as_token(),
                    if criterion.map(|c| c.operator) == Some(operator) {
                        " selected"
                    } else {
                        ""
                    },
                    operator.label()
                )
            })
            .collect();

        format!(
            r#"<div class="search-row">
                <select class="search-column">{columns}</select>
                <select class="search-operator">{operators}</select>
                <input type="text" class="search-value" placeholder="Search value" value="{value}">
                <button type="button" class="btn remove-row">Remove</button>
            </div>"#,
            columns = self.column_options(criterion.map(|c| c.column.as_str())),
            operators = operators,
            value = escape_html(criterion.map(|c| c.value.as_str()).unwrap_or("")),
        )
    }

    fn advanced_search_panel(&self) -> String {
        let base = QueryState {
            advanced: AdvancedSearch::default(),
            page: 1,
            ..self.state.clone()
        };
        let rows: String = if self.state.advanced.is_empty() {
            self.criterion_row(None)
        } else {
            self.state
                .advanced
                .criteria
                .iter()
                .map(|criterion| self.criterion_row(Some(criterion)))
                .collect()
        };
        let any = self.state.advanced.logic.as_token() == "any";

        format!(
            r#"
    <div class="filter-panel advanced-search" id="advanced-search" data-base-url="{base}"{hidden}>
        <h3>Advanced Search</h3>
        <div class="search-rows">{rows}</div>
        <template id="search-row-template">{template}</template>
        <button type="button" class="btn add-search-row">+ Add Search Criteria</button>
        <div class="search-logic">
            <label><input type="radio" name="search-logic" value="all"{all_checked}> Match ALL criteria</label>
            <label><input type="radio" name="search-logic" value="any"{any_checked}> Match ANY criteria</label>
        </div>
        <div class="panel-actions">
            <a class="btn back-btn" href="{base}">Clear</a>
            <button type="button" class="btn btn-primary apply-advanced-search">Search</button>
        </div>
    </div>"#,
            base = escape_html(&self.url(&base)),
            hidden = if self.state.advanced.is_empty() { " hidden" } else { "" },
            rows = rows,
            template = self.criterion_row(None),
            all_checked = if any { "" } else { " checked" },
            any_checked = if any { " checked" } else { "" },
        )
    }

    fn date_filter_panel(&self) -> String {
        let base = QueryState {
            date_filter: None,
            page: 1,
            ..self.state.clone()
        };
        let current = self.state.date_filter.as_ref();
        let options: String = self
            .table
            .date_columns()
            .map(|column| {
                format!(
                    r#"<option value="{name}"{selected}>{name}</option>"#,
                    name = escape_html(&column.name),
                    selected = if current.map(|f| f.column.as_str()) == Some(column.name.as_str()) {
                        " selected"
                    } else {
                        ""
                    },
                )
            })
            .collect();

        format!(
            r#"
    <div class="filter-panel date-filters" id="date-filter" data-base-url="{base}"{hidden}>
        <select id="date-column">{options}</select>
        <label>From <input type="date" id="date-from" value="{from}"></label>
        <label>To <input type="date" id="date-to" value="{to}"></label>
        <div class="panel-actions">
            <a class="btn back-btn" href="{base}">Clear</a>
            <button type="button" class="btn btn-primary apply-date-filter">Apply</button>
        </div>
    </div>"#,
            base = escape_html(&self.url(&base)),
            hidden = if current.is_none() { " hidden" } else { "" },
            options = options,
            from = escape_html(current.and_then(|f| f.from.as_deref()).unwrap_or("")),
            to = escape_html(current.and_then(|f| f.to.as_deref()).unwrap_or("")),
        )
    }

    fn header(&self, column: &ColumnDescriptor) -> String {
        let mut classes: Vec<&str> = Vec::new();
        let sortable = self.table.features.sortable_columns && column.sortable;
        let name = escape_html(&column.name);

        let direction = self.state.sort_direction(&column.name);
        match direction {
            Some(SortDirection::Ascending) => classes.push("sort-asc"),
            Some(SortDirection::Descending) => classes.push("sort-desc"),
            None => {}
        }
        if self.table.features.resizable_columns && column.resizable {
            classes.push("resizable");
        }

        let label = if sortable {
            classes.push("sortable");
            // Position in a multi-column sort
            let position = match self.state.sort.len() {
                0 | 1 => String::new(),
                _ => self
                    .state
                    .sort
                    .iter()
                    .position(|key| key.column == column.name)
                    .map(|index| format!(r#"<sup class="sort-position">{}</sup>"#, index + 1))
                    .unwrap_or_default(),
            };
            format!(
                r#"<a class="sort-link" href="{}" data-shift-href="{}">{}</a>{}"#,
                escape_html(&self.url(&self.state.header_sort(&column.name, false))),
                escape_html(&self.url(&self.state.header_sort(&column.name, true))),
                name,
                position
            )
        } else {
            name.clone()
        };

        format!(
            r#"<th data-col="{}" class="{}">{}</th>"#,
            name,
            classes.join(" "),
            label
        )
    }

    fn cell(&self, column: &ColumnDescriptor, row: &Row, id: Option<&str>) -> String {
        let value = row.get(&column.name).unwrap_or(&Value::Null);
        let raw = value_to_string(value);

        let view = match self.renderers.resolve(column.render_view.as_deref()) {
            Some(renderer) => renderer.render_view(value, row),
            None => escape_html(&truncate(&raw)),
        };

        let is_key = self.table.primary_key() == Some(column);
        let edit = match id {
            Some(id) if self.writable() && !is_key => format!(
                r#"<div class="grid-edit" hidden><form method="POST" action="{}" class="inline-form"><input type="hidden" class="column-name" name="field" value="{}">{}</form></div>"#,
                escape_html(&record_url(self.root, &self.table.name, "inline", id)),
                escape_html(&column.name),
                edit_control(column, "value", value, row, self.renderers, false)
            ),
            _ => String::new(),
        };

        format!(
            r#"<td class="grid-cell" data-col="{}" data-searchable="{}"><div class="old_value" hidden>{}</div><div class="grid-view">{}</div>{}</td>"#,
            escape_html(&column.name),
            column.searchable,
            escape_html(&raw),
            view,
            edit
        )
    }

    fn view_action(&self, id: Option<&str>) -> String {
        let link = id
            .map(|id| {
                format!(
                    r#"<a class="btn view-btn" href="{}">View</a>"#,
                    escape_html(&record_url(self.root, &self.table.name, "view", id))
                )
            })
            .unwrap_or_default();
        format!(
            r#"<td data-col="{}" class="actions">{}</td>"#,
            VIEW_ACTION_COLUMN, link
        )
    }

    fn edit_delete_actions(&self, id: Option<&str>) -> String {
        let buttons = id
            .map(|id| {
                format!(
                    r#"<a class="btn edit-btn" href="{}">Edit</a><form method="POST" action="{}" class="delete-form"><button type="submit" class="btn delete-btn">Delete</button></form>"#,
                    escape_html(&record_url(self.root, &self.table.name, "edit", id)),
                    escape_html(&record_url(self.root, &self.table.name, "delete", id)),
                )
            })
            .unwrap_or_default();
        format!(
            r#"<td data-col="{}" class="actions">{}</td>"#,
            EDIT_ACTION_COLUMN, buttons
        )
    }

    fn grid(&self) -> String {
        let columns: Vec<&ColumnDescriptor> = self.visible_columns().collect();

        let mut head = String::new();
        if self.writable() {
            head.push_str(&format!(
                r#"<th data-col="{}" class="action-col">View</th>"#,
                VIEW_ACTION_COLUMN
            ));
        }
        for column in &columns {
            head.push_str(&self.header(column));
        }
        if self.writable() {
            head.push_str(&format!(
                r#"<th data-col="{}" class="action-col">Actions</th>"#,
                EDIT_ACTION_COLUMN
            ));
        }

        let body: String = if self.rows.is_empty() {
            let span = columns.len() + if self.writable() { 2 } else { 0 };
            format!(
                r#"<tr><td colspan="{}" class="no-records">No records found</td></tr>"#,
                span.max(1)
            )
        } else {
            self.rows
                .iter()
                .map(|row| {
                    let id = self.table.row_key(row);
                    let id = id.as_deref();
                    let mut cells = String::new();
                    if self.writable() {
                        cells.push_str(&self.view_action(id));
                    }
                    for column in &columns {
                        cells.push_str(&self.cell(column, row, id));
                    }
                    if self.writable() {
                        cells.push_str(&self.edit_delete_actions(id));
                    }
                    format!(r#"<tr class="table-row">{}</tr>"#, cells)
                })
                .collect()
        };

        format!(
            r#"
    <div class="table-wrapper" id="table-root" data-sort="{sort}" data-current="{current}">
        <table>
            <thead><tr>{head}</tr></thead>
            <tbody>{body}</tbody>
        </table>
    </div>"#,
            sort = escape_html(&self.state.sort_token()),
            current = escape_html(&self.url(self.state)),
            head = head,
            body = body,
        )
    }

    fn page_link(&self, page: u64, label: &str, class: &str) -> String {
        format!(
            r#"<a class="page-link {}" href="{}">{}</a>"#,
            class,
            escape_html(&self.url(&self.state.with_page(page))),
            label
        )
    }

    fn pagination_controls(&self) -> String {
        let pagination = self.pagination;
        let info = if pagination.total_records == 0 {
            "No records found".to_string()
        } else {
            format!(
                "Showing {}–{} of {}",
                pagination.start_record, pagination.end_record, pagination.total_records
            )
        };

        let links = if pagination.total_pages > 1 {
            let mut links = String::new();
            if pagination.has_previous() {
                links.push_str(&self.page_link(pagination.page - 1, "&laquo; Prev", "prev"));
            } else {
                links.push_str(r#"<span class="page-link prev disabled">&laquo; Prev</span>"#);
            }
            for link in pagination.window() {
                match link {
                    PageLink::Page(page) if page == pagination.page => links.push_str(&format!(
                        r#"<span class="page-link current">{}</span>"#,
                        page
                    )),
                    PageLink::Page(page) => {
                        links.push_str(&self.page_link(page, &page.to_string(), ""))
                    }
                    PageLink::Gap => links.push_str(r#"<span class="page-gap">…</span>"#),
                }
            }
            if pagination.has_next() {
                links.push_str(&self.page_link(pagination.page + 1, "Next &raquo;", "next"));
            } else {
                links.push_str(r#"<span class="page-link next disabled">Next &raquo;</span>"#);
            }
            format!(r#"<nav class="pagination-links">{}</nav>"#, links)
        } else {
            String::new()
        };

        format!(
            r#"
    <div class="pagination">
        <span class="pagination-info">{}</span>
        {}
    </div>"#,
            info, links
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrudConfig;
    use crate::query_state::ListParams;
    use crate::schema::ColumnInfo;
    use axum::extract::Query;
    use axum::http::Uri;
    use serde_json::json;

    fn users(config: &CrudConfig) -> TableDescriptor {
        TableDescriptor::new(
            config,
            "users",
            vec![
                ColumnInfo {
                    is_primary_key: true,
                    nullable: false,
                    ..ColumnInfo::new("id", "INTEGER")
                },
                ColumnInfo::new("email", "TEXT"),
                ColumnInfo::new("bio", "TEXT"),
                ColumnInfo::new("created_at", "DATETIME"),
            ],
        )
    }

    fn rows() -> Vec<Row> {
        (1..=3)
            .map(|id| {
                let mut row = Row::new();
                row.insert("id".to_string(), json!(id));
                row.insert("email".to_string(), json!(format!("user{}@example.com", id)));
                row.insert("bio".to_string(), json!("x".repeat(400)));
                row.insert("created_at".to_string(), json!("2024-01-02 03:04:05"));
                row
            })
            .collect()
    }

    fn state(table: &TableDescriptor, query: &str) -> QueryState {
        let uri: Uri = format!("/users?{}", query).parse().unwrap();
        let Query(params) = Query::<ListParams>::try_from_uri(&uri).unwrap();
        QueryState::decode(&params, table)
    }

    fn render(table: &TableDescriptor, state: &QueryState, pagination: &Pagination) -> String {
        let rows = rows();
        let registry = RendererRegistry::new();
        render_list(&ListView {
            root: "/admin",
            table,
            rows: &rows,
            state,
            pagination,
            renderers: &registry,
        })
    }

    #[test]
    fn test_visible_columns_and_actions() {
        let config = CrudConfig::default();
        let table = users(&config);
        let state = state(&table, "visible=id,email&sort=id,desc");
        let html = render(&table, &state, &Pagination::new(1, Some(50), 3));

        assert!(html.contains(r#"<th data-col="__actions__""#));
        assert!(html.contains(r#"<th data-col="__editdelete__""#));
        assert!(html.contains(r#"<th data-col="email""#));
        assert!(!html.contains(r#"<th data-col="bio""#));
        assert!(html.contains(r#"<th data-col="id" class="sort-desc resizable sortable">"#));
        assert!(html.contains(r#"data-sort="id,desc""#));
        assert!(html.contains(r#"href="/admin/users/view/2""#));
        assert!(html.contains(r#"action="/admin/users/delete/3""#));
        assert!(html.contains(r#"action="/admin/users/inline/1""#));
        assert!(html.contains("Showing 1–3 of 3"));
    }

    #[test]
    fn test_header_links_carry_sort_transitions() {
        let config = CrudConfig::default();
        let table = users(&config);
        let state = state(&table, "sort=id,asc");
        let html = render(&table, &state, &Pagination::new(1, Some(50), 3));

        // Plain click on the only sort key toggles it; shift-click on another appends
        assert!(html.contains("href=\"/admin/users?sort=id%2Cdesc&amp;visible="));
        assert!(html.contains("data-shift-href=\"/admin/users?sort=id%2Casc%2Cemail%2Casc&amp;visible="));
    }

    #[test]
    fn test_long_values_are_truncated_but_kept() {
        let config = CrudConfig::default();
        let table = users(&config);
        let state = QueryState::initial(&table);
        let html = render(&table, &state, &Pagination::new(1, Some(50), 3));

        let full = "x".repeat(400);
        let cut = format!("{}…", "x".repeat(350));
        assert!(html.contains(&format!(r#"<div class="old_value" hidden>{}</div>"#, full)));
        assert!(html.contains(&format!(r#"<div class="grid-view">{}</div>"#, cut)));
    }

    #[test]
    fn test_read_only_table_has_no_write_controls() {
        let config = CrudConfig::from_yaml_str(
            "tables:\n  - name: users\n    customSql: SELECT * FROM people\n",
        )
        .unwrap();
        let table = users(&config);
        let state = QueryState::initial(&table);
        let html = render(&table, &state, &Pagination::new(1, Some(50), 3));

        assert!(!html.contains("__actions__"));
        assert!(!html.contains("/admin/users/new"));
        assert!(!html.contains("inline-form"));
        assert!(!html.contains("toggle-inline-btn"));
    }

    #[test]
    fn test_pagination_window_links() {
        let config = CrudConfig::default();
        let table = users(&config);
        let state = state(&table, "page=5");
        let html = render(&table, &state, &Pagination::new(5, Some(3), 30));

        assert!(html.contains("Showing 13–15 of 30"));
        assert!(html.contains(r#"<span class="page-link current">5</span>"#));
        assert!(html.contains("page=4\">4</a>"));
        assert!(html.contains(r#"<span class="page-gap">…</span>"#));
        assert!(html.contains("page=10\">10</a>"));
    }

    #[test]
    fn test_filter_panels() {
        let config = CrudConfig::default();
        let table = users(&config);
        let state = state(&table, "date=created_at,2024-01-01,&adv=email%3Aends%3A%40example.com");
        let html = render(&table, &state, &Pagination::new(1, Some(50), 3));

        assert!(html.contains(r#"id="advanced-search""#));
        assert!(html.contains(r#"<option value="ends" selected>Ends With</option>"#));
        assert!(html.contains(r#"id="date-from" value="2024-01-01""#));
        assert!(html.contains(r#"<input type="hidden" name="date" value="created_at,2024-01-01,">"#));
    }

    #[test]
    fn test_toggles_off() {
        let config = CrudConfig::from_yaml_str(
            "defaultTable:\n  advancedSearch: false\n  dateFilters: false\n  sortableColumns: false\n  instantSearch: false\n",
        )
        .unwrap();
        let table = users(&config);
        let state = QueryState::initial(&table);
        let html = render(&table, &state, &Pagination::new(1, Some(50), 3));

        assert!(!html.contains("advanced-search"));
        assert!(!html.contains("date-filter"));
        assert!(!html.contains("sort-link"));
        assert!(html.contains(r#"data-instant="false""#));
    }
}
