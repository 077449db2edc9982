//! Contract analysis endpoint
//!
//! `POST /api/analyze` with multipart fields `file` (required) and `prompt`
//! (optional). Responds with the spreadsheet as base64 and, when persistence
//! is enabled, the URL of a stored copy.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::BytesMut;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::llm::DocumentAnalyzer;
use crate::models::{AnalyzeResponse, AppState, UploadedDocument};
use crate::parser;
use crate::prompts;
use crate::spreadsheet::{self, SheetLayout};
use crate::types::{AnalysisRequest, AppError, AppResult};

/// Room for multipart boundaries and the prompt field on top of the file cap
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.upload.max_file_size as usize + MULTIPART_OVERHEAD;

    Router::new()
        .route("/api/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Fields read from the upload form
#[derive(Debug, Default)]
struct AnalyzeForm {
    file: Option<UploadedDocument>,
    prompt: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<AnalyzeResponse>> {
    let request_id = Uuid::new_v4();
    info!(%request_id, "Analysis request received");

    let form = read_form(&mut multipart, state.config.upload.max_file_size).await?;
    let document = form.file.ok_or(AppError::MissingFile)?;
    info!(
        %request_id,
        file = %document.name,
        size = document.size,
        mime = %document.mime,
        has_prompt = form.prompt.is_some(),
        "Document accepted"
    );

    let instructions = prompts::build_instructions(state.config.output.columns, form.prompt.as_deref());
    let original_name = document.name.clone();
    let request = AnalysisRequest {
        document,
        instructions,
    };

    let text = run_analysis(state.analyzer.clone(), request, state.shutdown.child_token()).await?;

    let (strategy, rows) = parser::parse_rows_with_strategy(&text);
    info!(%request_id, strategy = %strategy, rows = rows.len(), "Parsed analysis into rows");

    let layout = SheetLayout::from(&state.config.output);
    let workbook = spreadsheet::encode_workbook(&rows, &layout)?;
    let filename = spreadsheet::output_filename(&original_name, chrono::Utc::now());

    let result_url = if state.config.upload.persist_results {
        match state.downloads.save(&filename, &workbook).await {
            Ok(url) => Some(url),
            Err(e) => {
                error!(%request_id, error = %e, "Failed to store spreadsheet copy");
                None
            }
        }
    } else {
        None
    };

    info!(%request_id, %filename, bytes = workbook.len(), "Analysis complete");

    Ok(Json(AnalyzeResponse {
        result_url,
        excel_data: spreadsheet::to_base64(&workbook),
        filename,
    }))
}

/// Run the analysis on its own task so remote cleanup finishes even if the
/// client goes away mid-request.
async fn run_analysis(
    analyzer: Arc<dyn DocumentAnalyzer>,
    request: AnalysisRequest,
    cancel: CancellationToken,
) -> AppResult<String> {
    tokio::spawn(async move { analyzer.analyze(&request, &cancel).await })
        .await
        .map_err(|e| AppError::Internal(format!("Analysis task failed: {}", e)))?
}

async fn read_form(multipart: &mut Multipart, max_file_size: u64) -> AppResult<AnalyzeForm> {
    let mut form = AnalyzeForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("document").to_string();
                let mime = field
                    .content_type()
                    .map(str::to_string)
                    .filter(|m| m != mime::APPLICATION_OCTET_STREAM.essence_str())
                    .unwrap_or_else(|| mime_guess::from_path(&name).first_or_octet_stream().to_string());

                let mut buffer = BytesMut::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| multipart_error(e, max_file_size))?
                {
                    if (buffer.len() + chunk.len()) as u64 > max_file_size {
                        warn!(file = %name, max_file_size, "File size limit exceeded, aborting upload");
                        return Err(AppError::PayloadTooLarge { limit: max_file_size });
                    }
                    buffer.extend_from_slice(&chunk);
                }

                // An empty part is what the browser sends after the file was removed
                if buffer.is_empty() {
                    debug!(file = %name, "Ignoring empty file part");
                    continue;
                }

                form.file = Some(UploadedDocument::new(name, mime, buffer.freeze()));
            }
            "prompt" => {
                let prompt = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_file_size))?;
                form.prompt = Some(prompt).filter(|p| !p.trim().is_empty());
            }
            other => {
                debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError, max_file_size: u64) -> AppError {
    if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit: max_file_size }
    } else {
        AppError::InvalidRequest(format!("Failed to parse multipart data: {}", e.body_text()))
    }
}
