// HTTP client for the OpenAI REST API
// API Reference: https://platform.openai.com/docs/api-reference

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::UploadedDocument;
use crate::types::{AppError, AppResult};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Header value required by the assistants endpoints
const ASSISTANTS_BETA: &str = "assistants=v2";

/// Credentials and endpoint, constructed once per process
#[derive(Clone)]
pub struct ClientOptions {
    pub api_key: String,
    pub base_url: String,
}

impl ClientOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Clone)]
pub struct OpenAIClient {
    http: Client,
    options: ClientOptions,
    beta: Option<&'static str>,
}

/// Object returned by `POST /files`
#[derive(Debug, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

impl OpenAIClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            http: Client::new(),
            options,
            beta: None,
        }
    }

    /// Same credentials, with the `OpenAI-Beta: assistants=v2` header on every request
    pub fn with_assistants_beta(&self) -> Self {
        Self {
            beta: Some(ASSISTANTS_BETA),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.options.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.options.base_url, path);
        debug!(%method, %url, "OpenAI request");

        let builder = self.http.request(method, url).bearer_auth(&self.options.api_key);
        match self.beta {
            Some(beta) => builder.header("OpenAI-Beta", beta),
            None => builder,
        }
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::decode(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self.request(Method::GET, path).send().await?;
        Self::decode(response).await
    }

    pub async fn delete(&self, path: &str) -> AppResult<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Upload a document via `POST /files` (multipart)
    pub async fn upload_file(&self, document: &UploadedDocument, purpose: &str) -> AppResult<FileObject> {
        let part = reqwest::multipart::Part::bytes(document.bytes.to_vec())
            .file_name(document.name.clone())
            .mime_str(&document.mime)?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part("file", part);

        let response = self.request(Method::POST, "/files").multipart(form).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse OpenAI response: {}", e)))
    }

    async fn check(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();

        // Try to parse as OpenAI error response
        if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
            return Err(AppError::LLMApi(format!(
                "OpenAI API error ({}): {} (type: {:?}, code: {:?})",
                status,
                error_response.error.message,
                error_response.error.error_type,
                error_response.error.code
            )));
        }

        Err(AppError::LLMApi(format!("OpenAI API error ({}): {}", status, error_text)))
    }
}
