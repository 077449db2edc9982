// Inline-document chat completion
// The document travels inside the user message as a `file` content part.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::llm::client::OpenAIClient;
use crate::llm::provider::DocumentAnalyzer;
use crate::types::{AnalysisRequest, AppError, AppResult};

pub struct ChatAdapter {
    client: OpenAIClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

// Request types for the chat completions API
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: ChatMessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChatMessageContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatContentPart {
    Text { text: String },
    File { file: InlineFile },
}

#[derive(Serialize)]
struct InlineFile {
    filename: String,
    /// `data:<mime>;base64,<payload>`
    file_data: String,
}

// Response types
#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatAdapter {
    pub fn new(client: OpenAIClient, model: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    fn build_request(&self, request: &AnalysisRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ChatMessageContent::Text(request.instructions.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: ChatMessageContent::Parts(vec![
                        ChatContentPart::Text {
                            text: request.instructions.clone(),
                        },
                        ChatContentPart::File {
                            file: InlineFile {
                                filename: request.document.name.clone(),
                                file_data: request.document.data_uri(),
                            },
                        },
                    ]),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for ChatAdapter {
    async fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> AppResult<String> {
        let body = self.build_request(request);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            response = self.client.post_json::<_, ChatCompletionResponse>("/chat/completions", &body) => response?,
        };

        if let Some(usage) = &response.usage {
            info!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }

        let choice = response.choices.into_iter().next();
        if let Some(reason) = choice.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            debug!(finish_reason = reason, "Chat completion finish reason");
        }

        Ok(choice.and_then(|c| c.message.content).unwrap_or_default())
    }
}
