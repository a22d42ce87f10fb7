//! CSV export body

use crate::schema::{value_to_string, Row};

/// Quote a field when it contains a comma, quote, CR or LF
pub fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Header row of `columns` followed by one line per row, each ending in `\n`
pub fn render_csv(columns: &[&str], rows: &[Row]) -> String {
    let mut body = columns
        .iter()
        .map(|column| escape_csv(column))
        .collect::<Vec<_>>()
        .join(",");
    body.push('\n');

    for row in rows {
        let line = columns
            .iter()
            .map(|column| {
                row.get(*column)
                    .map(|value| escape_csv(&value_to_string(value)))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        body.push_str(&line);
        body.push('\n');
    }

    body
}
