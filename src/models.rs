use std::sync::Arc;

use base64::Engine;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::llm::{DocumentAnalyzer, LLM};
use crate::storage::DownloadStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub analyzer: Arc<dyn DocumentAnalyzer>,
    pub downloads: DownloadStore,
    /// Cancelled on server shutdown; analyses run on child tokens
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, shutdown: CancellationToken) -> Self {
        let analyzer: Arc<dyn DocumentAnalyzer> = Arc::new(LLM::new(&config.llm));
        Self::with_analyzer(config, analyzer, shutdown)
    }

    pub fn with_analyzer(
        config: Config,
        analyzer: Arc<dyn DocumentAnalyzer>,
        shutdown: CancellationToken,
    ) -> Self {
        let downloads = DownloadStore::new(config.upload.downloads_dir.clone());
        Self {
            config,
            analyzer,
            downloads,
            shutdown,
        }
    }
}

/// A document received from the upload form, held in memory for one request.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Bytes,
    pub name: String,
    pub size: u64,
    pub mime: String,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            size: bytes.len() as u64,
            bytes,
            name: name.into(),
            mime: mime.into(),
        }
    }

    /// `data:<mime>;base64,<payload>` form used for inline file content parts
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// One spreadsheet row. Column names are chosen when the sheet is written.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Row {
    pub label: String,
    pub value: String,
}

impl Row {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Section header: label only
    pub fn header(label: impl Into<String>) -> Self {
        Self::new(label, "")
    }

    /// Free-standing detail line with no label
    pub fn detail(value: impl Into<String>) -> Self {
        Self::new("", value)
    }
}

// API Request/Response types

/// Response format matching frontend expectations:
/// `{ resultUrl: string | null, excelData: string, filename: string }`
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub result_url: Option<String>,
    /// Base64-encoded xlsx workbook
    pub excel_data: String,
    pub filename: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub integration: String,
    pub model: String,
}
