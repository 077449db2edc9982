//! Static File Serving
//!
//! Serves the upload page from the configured static directory and the
//! stored spreadsheets under `/downloads`. When no `index.html` exists a
//! small built-in page describing the API is returned instead.

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::models::AppState;
use crate::storage::DOWNLOADS_ROUTE;

/// Create router for the frontend and stored spreadsheets
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    if static_dir.is_dir() {
        info!(path = %static_dir.display(), "Serving static files");
    } else {
        warn!(path = %static_dir.display(), "Static files directory not found, serving built-in page");
    }

    let downloads = ServeDir::new(state.downloads.root());
    let assets = ServeDir::new(&static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/", get(serve_index))
        .nest_service(DOWNLOADS_ROUTE, downloads)
        .fallback_service(assets)
        .with_state(state)
}

async fn serve_index(State(state): State<AppState>) -> Response {
    let index = state.config.server.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(content) => Html(content).into_response(),
        Err(_) => (
            [(header::CACHE_CONTROL, "no-cache")],
            Html(fallback_page(state.config.server.port)),
        )
            .into_response(),
    }
}

fn fallback_page(port: u16) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Contract Sheet</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 760px; margin: 0 auto; padding: 40px 20px; color: #222; }}
        code {{ background: #f2f2f2; padding: 2px 6px; border-radius: 4px; }}
        pre {{ background: #f7f7f7; padding: 15px; border-radius: 6px; overflow-x: auto; }}
    </style>
</head>
<body>
    <h1>Contract Sheet</h1>
    <p>Upload a contract and receive its key terms as an Excel spreadsheet.</p>
    <h3>Endpoints</h3>
    <ul>
        <li><code>POST /api/analyze</code> - multipart form with <code>file</code> and optional <code>prompt</code></li>
        <li><code>GET /api/health</code> - health check</li>
        <li><code>GET /downloads/&lt;filename&gt;</code> - stored spreadsheets</li>
    </ul>
    <h4>Example</h4>
    <pre>curl -X POST http://localhost:{port}/api/analyze \
  -F "file=@contract.pdf" \
  -F "prompt=Focus on payment terms"</pre>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn state(dir: &TempDir) -> AppState {
        let mut config = Config::default();
        config.llm.api_key = "sk-test".to_string();
        config.server.static_dir = dir.path().join("static");
        config.upload.downloads_dir = dir.path().join("downloads");
        AppState::new(config, CancellationToken::new())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_builtin_page_when_frontend_missing() {
        let dir = TempDir::new().unwrap();
        let response = router(state(&dir))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("POST /api/analyze"));
    }

    #[tokio::test]
    async fn test_index_html_is_served() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/index.html"), "<h1>upload</h1>").unwrap();

        let response = router(state(&dir))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(body_text(response).await, "<h1>upload</h1>");
    }

    #[tokio::test]
    async fn test_stored_spreadsheet_is_downloadable() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let url = state.downloads.save("nda_analysis_1.xlsx", b"PK\x03\x04").await.unwrap();

        let response = router(state)
            .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"PK\x03\x04");
    }

    #[tokio::test]
    async fn test_missing_download_is_404() {
        let dir = TempDir::new().unwrap();
        let response = router(state(&dir))
            .oneshot(Request::builder().uri("/downloads/nope.xlsx").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
