//! Embedded stylesheet and client script

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use include_dir::{include_dir, Dir};

// Embed the assets directory at compile time
static ASSETS: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// GET `{root}/assets/{*path}`
///
/// Caching: max-age=3600 (1 hour); the files are not fingerprinted.
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    let Some(file) = ASSETS.get_file(&path) else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Asset not found: {}", path),
        )
            .into_response();
    };

    let mime_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    (
        [
            (header::CONTENT_TYPE, mime_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        file.contents(),
    )
        .into_response()
}
