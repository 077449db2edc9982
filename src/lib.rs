// Contract Sheet - turns uploaded contracts into spreadsheets of key terms

pub mod config;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod parser;
pub mod prompts;
pub mod routes;
pub mod spreadsheet;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use types::{AppError, AppResult};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
