//! Database configuration form shown while no connection is available

use super::escape_html;
use crate::config::{Backend, DatabaseSettings};

pub const TITLE: &str = "Database Connection Required";

/// Form posting to `{root}/db-config`, prefilled from `settings`
///
/// The password is never echoed back.
pub fn render_db_config(root: &str, settings: &DatabaseSettings, error: Option<&str>) -> String {
    let error = error
        .map(|message| format!(r#"<div class="error-message">{}</div>"#, escape_html(message)))
        .unwrap_or_default();

    let options: String = [Backend::Mysql, Backend::Postgres, Backend::Sqlite]
        .into_iter()
        .map(|backend| {
            format!(
                r#"<option value="{value}"{selected}>{value}</option>"#,
                value = backend.as_str(),
                selected = if backend == settings.backend {
                    " selected"
                } else {
                    ""
                },
            )
        })
        .collect();

    let port = settings
        .effective_port()
        .map(|port| port.to_string())
        .unwrap_or_default();

    format!(
        r#"<div class="db-error-form">
        {error}
        <p>The database could not be reached. Enter the connection settings to continue.</p>
        <form method="POST" action="{root}/db-config">
            <div class="form-group">
                <label for="backend">Backend</label>
                <select id="backend" name="backend">{options}</select>
            </div>
            <div class="form-group">
                <label for="host">Host</label>
                <input type="text" id="host" name="host" value="{host}">
            </div>
            <div class="form-group">
                <label for="port">Port</label>
                <input type="number" id="port" name="port" value="{port}">
            </div>
            <div class="form-group">
                <label for="user">User</label>
                <input type="text" id="user" name="user" value="{user}">
            </div>
            <div class="form-group">
                <label for="password">Password</label>
                <input type="password" id="password" name="password" value="">
            </div>
            <div class="form-group">
                <label for="database">Database</label>
                <input type="text" id="database" name="database" value="{database}" placeholder="name, or file path for SQLite">
            </div>
            <button type="submit" class="btn btn-primary">Connect</button>
        </form>
    </div>"#,
        error = error,
        root = root,
        options = options,
        host = escape_html(&settings.host),
        port = port,
        user = escape_html(&settings.user),
        database = escape_html(&settings.database),
    )
}
