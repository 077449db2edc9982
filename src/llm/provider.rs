use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::LLMConfig;
use crate::llm::assistant::AssistantAdapter;
use crate::llm::chat::ChatAdapter;
use crate::llm::client::{ClientOptions, OpenAIClient};
use crate::types::{AnalysisRequest, AppResult, IntegrationStyle};
use crate::utils::PollPolicy;

/// Capability: submit (document, instructions) and get the model's text back.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> AppResult<String>;
}

pub struct LLM {
    adapter: Box<dyn DocumentAnalyzer>,
    style: IntegrationStyle,
    model: String,
}

impl LLM {
    pub fn new(config: &LLMConfig) -> Self {
        let client = OpenAIClient::new(
            ClientOptions::new(config.api_key.clone()).with_base_url(config.base_url.clone()),
        );

        let adapter: Box<dyn DocumentAnalyzer> = match config.integration {
            IntegrationStyle::Chat => Box::new(ChatAdapter::new(
                client,
                config.model.clone(),
                config.max_tokens,
                config.temperature,
            )),
            IntegrationStyle::Assistant => Box::new(AssistantAdapter::new(
                &client,
                config.model.clone(),
                PollPolicy {
                    interval: config.poll_interval,
                    max_attempts: config.poll_max_attempts,
                },
            )),
        };

        Self {
            adapter,
            style: config.integration,
            model: config.model.clone(),
        }
    }

    pub fn style(&self) -> IntegrationStyle {
        self.style
    }
}

#[async_trait]
impl DocumentAnalyzer for LLM {
    async fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> AppResult<String> {
        info!(
            style = %self.style,
            model = %self.model,
            file = %request.document.name,
            size = request.document.size,
            "Submitting document for analysis"
        );
        let text = self.adapter.analyze(request, cancel).await?;
        info!(style = %self.style, chars = text.len(), "Received analysis");
        Ok(text)
    }
}
