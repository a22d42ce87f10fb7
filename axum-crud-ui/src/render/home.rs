//! Table index page

use super::{escape_html, table_url};
use crate::schema::TableLink;

/// Card grid linking to every exposed table
pub fn render_home(root: &str, tables: &[TableLink]) -> String {
    if tables.is_empty() {
        return r#"<div class="no-tables">No tables available</div>"#.to_string();
    }

    let cards: String = tables
        .iter()
        .map(|table| {
            format!(
                r#"
        <a class="table-card" href="{url}">
            <div class="table-card-header"><h3>{display_name}</h3></div>
            <div class="table-card-body"><p>{description}</p></div>
            <div class="table-card-footer"><span class="table-name">{name}</span></div>
        </a>"#,
                url = escape_html(&table_url(root, &table.name)),
                display_name = escape_html(&table.display_name),
                description = escape_html(&table.description),
                name = escape_html(&table.name),
            )
        })
        .collect();

    format!(r#"<div class="table-grid">{}</div>"#, cards)
}
