//! HTML and CSV rendering
//!
//! Every function here is pure: it takes descriptors, rows and state and
//! returns a string. Handlers in [`crate::routes`] wrap the output in
//! responses.

pub mod csv;
pub mod db_config;
pub mod form;
pub mod grid;
pub mod home;

use std::borrow::Cow;

/// Longest cell text shown in the grid before it is cut off
pub const DISPLAY_LIMIT: usize = 350;

/// Escape text for use in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Cut `text` to [`DISPLAY_LIMIT`] characters, marking the cut with `…`
pub fn truncate(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(DISPLAY_LIMIT) {
        Some((cut, _)) => Cow::Owned(format!("{}…", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

/// `{root}/{table}`
pub fn table_url(root: &str, table: &str) -> String {
    format!("{}/{}", root, urlencoding::encode(table))
}

/// `{root}/{table}/{action}/{id}`
pub fn record_url(root: &str, table: &str, action: &str, id: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        root,
        urlencoding::encode(table),
        action,
        urlencoding::encode(id)
    )
}

/// Link target for the index page; never empty
pub fn home_url(root: &str) -> String {
    if root.is_empty() {
        "/".to_string()
    } else {
        root.to_string()
    }
}

/// Wrap page content in the document shell
///
/// `title` and `back` are rendered as given after escaping; `body` is trusted HTML.
pub fn page(root: &str, title: &str, back: Option<&str>, body: &str) -> String {
    let back_link = back
        .map(|url| {
            format!(
                r#"<a href="{}" class="back-btn">&#8592; Back</a>"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - CRUD UI</title>
    <link rel="stylesheet" href="{root}/assets/style.css">
    <script src="{root}/assets/client.js" defer></script>
</head>
<body>
    <div class="container">
        {back_link}
        <h1>{title}</h1>
        {body}
    </div>
</body>
</html>
"#,
        title = escape_html(title),
        root = root,
        back_link = back_link,
        body = body,
    )
}

/// Page shown for failed requests
pub fn error_page(root: &str, title: &str, message: &str) -> String {
    let body = format!(
        r#"<div class="error-message">{}</div>
        <p><a href="{}" class="btn">Go to tables</a></p>"#,
        escape_html(message),
        escape_html(&home_url(root))
    );
    page(root, title, None, &body)
}
