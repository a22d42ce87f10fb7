use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::{routing::get, Router};
use axum_crud_ui::render::escape_html;
use axum_crud_ui::{CellRenderer, CrudConfig, CrudUi, Row};
use clap::Parser;
use serde_json::Value;

mod database;

/// Example server mounting the CRUD UI under /admin
#[derive(Parser, Debug)]
#[command(name = "example-server", version, about)]
struct Args {
    /// YAML configuration file; the bundled demo configuration is used when absent
    #[arg(short, long, env = "CRUD_UI_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "CRUD_UI_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Create and fill the demo tables (SQLite only)
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

const DEMO_CONFIG: &str = include_str!("../crud-ui.yaml");

/// Shows prices with two decimals and a currency sign
struct PriceRenderer;

impl CellRenderer for PriceRenderer {
    fn render_view(&self, value: &Value, _row: &Row) -> String {
        match value.as_f64() {
            Some(price) => format!("${:.2}", price),
            None => String::new(),
        }
    }

    fn render_edit(&self, name: &str, value: &Value, _row: &Row) -> String {
        let price = value.as_f64().map(|price| format!("{:.2}", price));
        format!(
            r#"<input type="number" step="0.01" min="0" name="{}" value="{}" class="edit-input">"#,
            escape_html(name),
            price.unwrap_or_default()
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,axum_crud_ui=debug")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CrudConfig::from_path(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => CrudConfig::from_yaml_str(DEMO_CONFIG)?,
    };

    if args.seed_demo {
        database::seed(&config.database)
            .await
            .context("failed to seed the demo database")?;
    }

    let admin = CrudUi::new(config.clone())
        .with_renderer("price", PriceRenderer)
        .init()
        .await
        .context("failed to start the CRUD UI")?;

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .merge(admin);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;

    tracing::info!(
        address = %args.listen,
        admin = %format!("http://{}{}", args.listen, config.normalized().root_path),
        "server running"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn root_handler() -> &'static str {
    "Welcome to the axum-crud-ui example server"
}

async fn health_handler() -> &'static str {
    "Server is healthy"
}
