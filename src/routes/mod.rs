//! API Routes
//!
//! - `POST /api/analyze` - contract upload and spreadsheet generation
//! - `GET /api/health` - health check
//! - `/downloads/*` - stored spreadsheets
//! - `/` - static frontend

pub mod analyze;
pub mod health;
pub mod static_files;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
///
/// API routes take precedence; everything else falls through to static files.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(analyze::router(state.clone()))
        .merge(health::router(state.clone()))
        .merge(static_files::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
