// Assistant workflow: upload the document, create an assistant and a thread,
// start a run, poll it to completion, then read the newest assistant message.
//
// Every remote object created along the way is deleted afterwards, whatever
// the outcome of the run.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::llm::client::OpenAIClient;
use crate::llm::provider::DocumentAnalyzer;
use crate::types::{AnalysisRequest, AppError, AppResult};
use crate::utils::{poll_until_complete, JobStatus, PollPolicy};

/// File-search citation markers such as `【4:0†source】`
static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"【[^】]*】").expect("citation pattern is valid"));

pub struct AssistantAdapter {
    client: OpenAIClient,
    model: String,
    poll: PollPolicy,
}

#[derive(Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    message: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
struct ThreadMessage {
    role: String,
    content: Vec<MessageContent>,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Deserialize)]
struct MessageText {
    value: String,
}

impl RunObject {
    fn job_status(&self) -> JobStatus {
        match self.status.as_str() {
            "queued" => JobStatus::Submitted,
            "in_progress" | "cancelling" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "requires_action" => JobStatus::Failed("run requires a tool action, which is not supported".to_string()),
            "failed" | "cancelled" | "expired" | "incomplete" => JobStatus::Failed(
                self.last_error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| format!("run {}", self.status)),
            ),
            other => {
                debug!(status = other, "Unknown run status, still waiting");
                JobStatus::Processing
            }
        }
    }
}

impl MessageList {
    /// Text of the newest assistant message (the list is newest first)
    fn latest_assistant_text(&self) -> Option<String> {
        let message = self.data.iter().find(|m| m.role == "assistant")?;
        let text: Vec<&str> = message
            .content
            .iter()
            .filter(|c| c.kind == "text")
            .filter_map(|c| c.text.as_ref().map(|t| t.value.as_str()))
            .collect();
        if text.is_empty() {
            return None;
        }
        Some(CITATION.replace_all(&text.join("\n"), "").into_owned())
    }
}

/// Remote object created during one analysis
#[derive(Debug, Clone, PartialEq, Eq)]
enum RemoteResource {
    File(String),
    Assistant(String),
    Thread(String),
}

impl RemoteResource {
    fn path(&self) -> String {
        match self {
            RemoteResource::File(id) => format!("/files/{}", id),
            RemoteResource::Assistant(id) => format!("/assistants/{}", id),
            RemoteResource::Thread(id) => format!("/threads/{}", id),
        }
    }
}

/// Tracks created objects so they can be released in reverse order
#[derive(Debug, Default)]
struct RemoteResources {
    created: Vec<RemoteResource>,
}

impl RemoteResources {
    fn track(&mut self, resource: RemoteResource) {
        self.created.push(resource);
    }

    /// Delete everything tracked. Failures are logged, never returned.
    async fn release(self, client: &OpenAIClient) {
        for resource in self.created.into_iter().rev() {
            match client.delete(&resource.path()).await {
                Ok(()) => debug!(resource = ?resource, "Released remote resource"),
                Err(e) => warn!(resource = ?resource, error = %e, "Failed to release remote resource"),
            }
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> AppResult<()> {
    if cancel.is_cancelled() {
        Err(AppError::Cancelled)
    } else {
        Ok(())
    }
}

impl AssistantAdapter {
    pub fn new(client: &OpenAIClient, model: impl Into<String>, poll: PollPolicy) -> Self {
        Self {
            client: client.with_assistants_beta(),
            model: model.into(),
            poll,
        }
    }

    async fn execute(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
        resources: &mut RemoteResources,
    ) -> AppResult<String> {
        let file = self.client.upload_file(&request.document, "assistants").await?;
        resources.track(RemoteResource::File(file.id.clone()));
        debug!(file_id = %file.id, "Uploaded document");
        ensure_active(cancel)?;

        let assistant: ObjectId = self
            .client
            .post_json(
                "/assistants",
                &json!({
                    "name": "Contract Analyzer",
                    "model": self.model,
                    "instructions": request.instructions,
                    "tools": [{ "type": "file_search" }],
                }),
            )
            .await?;
        resources.track(RemoteResource::Assistant(assistant.id.clone()));
        ensure_active(cancel)?;

        let thread: ObjectId = self
            .client
            .post_json(
                "/threads",
                &json!({
                    "messages": [{
                        "role": "user",
                        "content": request.instructions,
                        "attachments": [{
                            "file_id": file.id,
                            "tools": [{ "type": "file_search" }],
                        }],
                    }],
                }),
            )
            .await?;
        resources.track(RemoteResource::Thread(thread.id.clone()));
        ensure_active(cancel)?;

        let run: RunObject = self
            .client
            .post_json(
                &format!("/threads/{}/runs", thread.id),
                &json!({ "assistant_id": assistant.id }),
            )
            .await?;
        info!(thread_id = %thread.id, run_id = %run.id, status = %run.status, "Started assistant run");

        let run_path = format!("/threads/{}/runs/{}", thread.id, run.id);
        let client = &self.client;
        let run_path = run_path.as_str();
        let attempts = poll_until_complete(&self.poll, cancel, move || async move {
            let run: RunObject = client.get_json(run_path).await?;
            Ok::<_, AppError>(run.job_status())
        })
        .await?;
        info!(run_id = %run.id, attempts, "Assistant run completed");

        let messages: MessageList = self
            .client
            .get_json(&format!("/threads/{}/messages", thread.id))
            .await?;

        messages
            .latest_assistant_text()
            .ok_or_else(|| AppError::LLMApi("Assistant returned no text response".to_string()))
    }
}

#[async_trait]
impl DocumentAnalyzer for AssistantAdapter {
    async fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> AppResult<String> {
        let mut resources = RemoteResources::default();
        let outcome = self.execute(request, cancel, &mut resources).await;
        resources.release(&self.client).await;
        outcome
    }
}
