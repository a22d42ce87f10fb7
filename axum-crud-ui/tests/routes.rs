//! Router tests over an in-memory SQLite database

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use axum_crud_ui::sql::{SqlValue, Statement};
use axum_crud_ui::{Backend, CrudConfig, CrudUi, DatabaseProvider, DatabaseSettings, SqliteProvider};
use tower::ServiceExt;

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL, name TEXT, created_at DATETIME)",
    "INSERT INTO users (email, name, created_at) VALUES ('alice@example.com', 'Alice', '2024-01-10 09:00:00')",
    "INSERT INTO users (email, name, created_at) VALUES ('bob@example.com', 'Bob', '2024-02-11 10:00:00')",
    "INSERT INTO users (email, name, created_at) VALUES ('sally@example.com', 'Sally', '2024-03-12 11:00:00')",
    "INSERT INTO users (email, name, created_at) VALUES ('dave@example.com', 'Dave, \"the\" admin', NULL)",
];

fn memory_settings() -> DatabaseSettings {
    DatabaseSettings {
        backend: Backend::Sqlite,
        database: ":memory:".to_string(),
        ..DatabaseSettings::default()
    }
}

fn statement(sql: &str) -> Statement {
    Statement {
        sql: sql.to_string(),
        params: Vec::<SqlValue>::new(),
    }
}

async fn provider() -> Arc<SqliteProvider> {
    let provider = SqliteProvider::connect(&memory_settings()).await.unwrap();
    for sql in SCHEMA {
        provider.execute(&statement(sql)).await.unwrap();
    }
    Arc::new(provider)
}

async fn app_with(config: &str) -> (Router, Arc<SqliteProvider>) {
    let provider = provider().await;
    let config = CrudConfig::from_yaml_str(config).unwrap();
    let router = CrudUi::new(config)
        .init_with(provider.clone())
        .await
        .unwrap();
    (router, provider)
}

async fn app() -> (Router, Arc<SqliteProvider>) {
    app_with("{}").await
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post(app: &Router, uri: &str, form: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn email_of(provider: &SqliteProvider, id: i64) -> Option<String> {
    let rows = provider
        .fetch_rows(&statement(&format!(
            "SELECT email FROM users WHERE id = {}",
            id
        )))
        .await
        .unwrap();
    rows.first()
        .and_then(|row| row.get("email"))
        .and_then(|value| value.as_str().map(str::to_string))
}

#[tokio::test]
async fn test_home_lists_tables() {
    let (app, _) = app().await;
    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("<h1>Tables</h1>"));
    assert!(html.contains(r#"href="/users""#));
    assert!(html.contains("Manage users records"));
}

#[tokio::test]
async fn test_list_search_sort_and_visible_columns() {
    let (app, _) = app().await;
    let response = get(&app, "/users?search=al&sort=id,desc&visible=id,email&page=1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    let sally = html.find("sally@example.com").unwrap();
    let alice = html.find("alice@example.com").unwrap();
    assert!(sally < alice);
    assert!(!html.contains("bob@example.com"));

    assert!(html.contains(r#"<th data-col="id" class="sort-desc"#));
    assert!(html.contains(r#"<th data-col="email""#));
    assert!(!html.contains(r#"<th data-col="name""#));
    assert!(html.contains(r#"<th data-col="__actions__""#));
    assert!(html.contains(r#"<th data-col="__editdelete__""#));
    assert!(html.contains("Showing 1–2 of 2"));
}

#[tokio::test]
async fn test_list_paginates() {
    let (app, _) = app_with(
        r#"
defaultTable:
  pagination:
    pageSize: 3
"#,
    )
    .await;

    let html = body_text(get(&app, "/users?sort=id,asc&page=2").await).await;
    assert!(html.contains("dave@example.com"));
    assert!(!html.contains("alice@example.com"));
    assert!(html.contains("Showing 4–4 of 4"));

    // Out-of-range pages are clamped
    let html = body_text(get(&app, "/users?sort=id,asc&page=9").await).await;
    assert!(html.contains("Showing 4–4 of 4"));
}

#[tokio::test]
async fn test_csv_export() {
    let (app, _) = app().await;
    let response = get(&app, "/users?csv=1&visible=id,name&sort=id,asc").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        r#"attachment; filename="users.csv""#
    );

    let csv = body_text(response).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "id,name");
    assert_eq!(lines[1], "1,Alice");
    assert_eq!(lines[4], r#"4,"Dave, ""the"" admin""#);
    assert_eq!(lines.len(), 5);
}

#[tokio::test]
async fn test_unknown_table_is_not_found() {
    let (app, _) = app().await;
    let response = get(&app, "/ghosts").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Not Found"));
}

#[tokio::test]
async fn test_create_edit_and_delete() {
    let (app, provider) = app().await;

    let response = get(&app, "/users/new").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(r#"action="/users/new""#));

    let response = post(&app, "/users/new", "email=erin%40example.com&name=Erin&created_at=").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");
    assert_eq!(email_of(&provider, 5).await.as_deref(), Some("erin@example.com"));

    let response = get(&app, "/users/edit/5").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("erin@example.com"));

    let response = post(&app, "/users/edit/5", "email=erin%40example.org&name=Erin&created_at=").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");
    assert_eq!(email_of(&provider, 5).await.as_deref(), Some("erin@example.org"));

    let response = post(&app, "/users/delete/5", "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(email_of(&provider, 5).await, None);

    let response = get(&app, "/users/edit/5").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_view_page_saves_and_returns() {
    let (app, provider) = app().await;

    let response = get(&app, "/users/view/2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"id="view-edit-form""#));
    assert!(html.contains(r#"href="/users/duplicate/2""#));

    let response = post(
        &app,
        "/users/edit/2",
        "__return=view&email=robert%40example.com&name=Robert&created_at=2024-02-11T10%3A00",
    )
    .await;
    assert_eq!(location(&response), "/users/view/2");

    let response = post(&app, "/users/view/2", "email=bobby%40example.com&name=Bobby").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/view/2");
    assert_eq!(email_of(&provider, 2).await.as_deref(), Some("bobby@example.com"));
}

#[tokio::test]
async fn test_duplicate_toggle() {
    let (app, _) = app().await;
    let response = get(&app, "/users/duplicate/1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Duplicate users"));
    assert!(html.contains("alice@example.com"));

    let (app, _) = app_with(
        r#"
tables:
  - name: users
    duplicate: false
"#,
    )
    .await;
    let response = get(&app, "/users/duplicate/1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inline_update() {
    let (app, provider) = app().await;

    let response = post(&app, "/users/inline/1", "field=email&value=ally%40example.com").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(email_of(&provider, 1).await.as_deref(), Some("ally@example.com"));

    let response = post(&app, "/users/inline/1", "field=password&value=x").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(email_of(&provider, 1).await.as_deref(), Some("ally@example.com"));

    // The key column is never editable
    let response = post(&app, "/users/inline/1", "field=id&value=99").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(email_of(&provider, 1).await.as_deref(), Some("ally@example.com"));
}

#[tokio::test]
async fn test_custom_table_is_read_only() {
    let (app, _) = app_with(
        r#"
tables:
  - name: user_emails
    displayName: User Emails
    customSql: SELECT id, email FROM users WHERE email LIKE '%example.com';
"#,
    )
    .await;

    let response = get(&app, "/user_emails?sort=email,desc").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<h1>User Emails</h1>"));
    assert!(html.contains("sally@example.com"));
    assert!(!html.contains("__editdelete__"));

    assert_eq!(get(&app, "/user_emails/new").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        post(&app, "/user_emails/delete/1", "").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_hidden_table_is_not_routed() {
    let (app, _) = app_with(
        r#"
tables:
  - name: users
    hidden: true
"#,
    )
    .await;
    assert!(body_text(get(&app, "/").await).await.contains("No tables available"));
    assert_eq!(get(&app, "/users").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_root_path() {
    let (app, _) = app_with("rootPath: /admin/").await;

    let response = get(&app, "/admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(r#"href="/admin/users""#));

    let response = get(&app, "/admin/users?sort=id,asc").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(r#"href="/admin/users/view/1""#));

    let response = get(&app, "/admin/ghosts").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response)
        .await
        .contains(r#"href="/admin/assets/style.css""#));

    let response = get(&app, "/admin/assets/client.js").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/admin/users/view/1/extra").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response).await;
    assert!(html.contains(r#"href="/admin/assets/style.css""#));
    assert!(html.contains("/admin/users/view/1/extra"));

    // Paths outside the root belong to the host application
    let response = get(&app, "/elsewhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_recovery_form_on_unmatched_paths_under_root() {
    let config = CrudConfig::from_yaml_str(
        r#"
rootPath: /admin
database:
  backend: sqlite
  database: ""
"#,
    )
    .unwrap();
    let app = CrudUi::new(config).init().await.unwrap();

    for uri in ["/admin/a/b/c", "/admin/users/edit/1/more"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Database Connection Required"));
        assert!(html.contains(r#"action="/admin/db-config""#));
    }

    assert_eq!(get(&app, "/other").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recovery_form_and_reconfiguration() {
    let config = CrudConfig::from_yaml_str(
        r#"
database:
  backend: sqlite
  database: ""
"#,
    )
    .unwrap();
    let app = CrudUi::new(config).init().await.unwrap();

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Database Connection Required"));
    assert!(html.contains(r#"action="/db-config""#));

    // Every page shows the form until the database is configured
    let html = body_text(get(&app, "/users").await).await;
    assert!(html.contains("Database Connection Required"));

    let response = get(&app, "/a/b/c").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Database Connection Required"));

    let response = post(&app, "/db-config", "backend=oracle&database=").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("error-message"));

    let response = post(&app, "/db-config", "backend=sqlite&database=%3Amemory%3A").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let html = body_text(get(&app, "/").await).await;
    assert!(html.contains("<h1>Tables</h1>"));
    assert!(!html.contains("Database Connection Required"));
}

#[tokio::test]
async fn test_startup_fails_without_recovery_ui() {
    let config = CrudConfig::from_yaml_str(
        r#"
database:
  backend: sqlite
  database: ""
features:
  dbErrorUI: false
"#,
    )
    .unwrap();
    assert!(CrudUi::new(config).init().await.is_err());
}
