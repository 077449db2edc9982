// Type definitions, enums and the application error

use std::str::FromStr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::UploadedDocument;

/// How the external language-model service is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStyle {
    /// One chat completion with the document embedded inline
    #[default]
    Chat,
    /// Upload + assistant/thread/run, polled until the run finishes
    Assistant,
}

impl std::fmt::Display for IntegrationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrationStyle::Chat => write!(f, "chat"),
            IntegrationStyle::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for IntegrationStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" | "completion" => Ok(IntegrationStyle::Chat),
            "assistant" | "assistants" => Ok(IntegrationStyle::Assistant),
            other => Err(AppError::InvalidRequest(format!(
                "Unsupported LLM integration style: {}",
                other
            ))),
        }
    }
}

/// Everything the external service needs for one analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub document: UploadedDocument,
    pub instructions: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No file provided")]
    MissingFile,

    #[error("File size exceeds {} limit", size_limit(.limit))]
    PayloadTooLarge { limit: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis job failed: {0}")]
    JobFailed(String),

    #[error("Analysis job did not finish after {0} status checks")]
    JobTimedOut(u32),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// `10MB` for whole mebibytes, bytes otherwise
fn size_limit(limit: &u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if *limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else if *limit >= MIB {
        format!("{:.1}MB", *limit as f64 / MIB as f64)
    } else {
        format!("{} bytes", limit)
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFile | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Downstream detail stays in the logs; clients get a uniform message
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Failed to process file".to_string()
        } else {
            tracing::debug!(error = %self, "Client error");
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
