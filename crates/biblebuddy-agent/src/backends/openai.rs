use crate::config::AssistantConfig;
use async_trait::async_trait;
use biblebuddy_core::{
    AssistantService, AssistantSpec, BuddyError, BuddyResult, MessageOrder, Role, Run, RunStatus,
    ThreadMessage,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Most messages fetched per listing; a reply is always near the top.
const LIST_LIMIT: u32 = 100;

/// OpenAI Assistants v2 backend.
///
/// Works with any server exposing the `/v1/assistants`, `/v1/threads`,
/// `/v1/threads/{id}/messages` and `/v1/threads/{id}/runs` endpoints.
pub struct OpenAiAssistantsBackend {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiAssistantsBackend {
    pub fn new(config: &AssistantConfig) -> BuddyResult<Self> {
        let api_key = config
            .credential()
            .ok_or(BuddyError::MissingCredential)?
            .to_string();
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BuddyError::Http(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url().to_string(),
            api_key,
            http,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/v1/{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> BuddyResult<T> {
        let resp = request
            .send()
            .await
            .map_err(|e| BuddyError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BuddyError::Http(e.to_string()))?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(BuddyError::Unauthorized(api_error_message(&body)));
        }
        if !status.is_success() {
            return Err(BuddyError::Http(format!(
                "Assistant API error {}: {}",
                status,
                api_error_message(&body)
            )));
        }

        debug!(path, status = %status, "Assistant API call succeeded");
        serde_json::from_str(&body)
            .map_err(|e| BuddyError::MalformedResponse(format!("{path}: {e}")))
    }
}

#[async_trait]
impl AssistantService for OpenAiAssistantsBackend {
    async fn create_assistant(&self, spec: &AssistantSpec) -> BuddyResult<String> {
        let path = "assistants";
        let created: IdObject = self
            .send(path, self.request(Method::POST, path).json(spec))
            .await?;
        created.into_id(path)
    }

    async fn create_thread(&self) -> BuddyResult<String> {
        let path = "threads";
        let created: IdObject = self
            .send(
                path,
                self.request(Method::POST, path).json(&serde_json::json!({})),
            )
            .await?;
        created.into_id(path)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> BuddyResult<String> {
        let path = format!("threads/{thread_id}/messages");
        let body = serde_json::json!({
            "role": role.as_str(),
            "content": content,
        });
        let created: IdObject = self
            .send(&path, self.request(Method::POST, &path).json(&body))
            .await?;
        created.into_id(&path)
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> BuddyResult<Run> {
        let path = format!("threads/{thread_id}/runs");
        let body = serde_json::json!({ "assistant_id": assistant_id });
        let run: RunObject = self
            .send(&path, self.request(Method::POST, &path).json(&body))
            .await?;
        run.into_run(&path)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> BuddyResult<Run> {
        let path = format!("threads/{thread_id}/runs/{run_id}");
        let run: RunObject = self.send(&path, self.request(Method::GET, &path)).await?;
        run.into_run(&path)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> BuddyResult<Run> {
        let path = format!("threads/{thread_id}/runs/{run_id}/cancel");
        let run: RunObject = self.send(&path, self.request(Method::POST, &path)).await?;
        run.into_run(&path)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: MessageOrder,
    ) -> BuddyResult<Vec<ThreadMessage>> {
        let path = format!("threads/{thread_id}/messages");
        let request = self.request(Method::GET, &path).query(&[
            ("order", order.as_query().to_string()),
            ("limit", LIST_LIMIT.to_string()),
        ]);
        let list: MessageList = self.send(&path, request).await?;
        parse_message_list(list, order, &path)
    }
}

// --- Wire types ---

#[derive(Deserialize)]
struct IdObject {
    id: String,
}

impl IdObject {
    fn into_id(self, path: &str) -> BuddyResult<String> {
        non_empty_id(self.id, path)
    }
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Deserialize)]
struct RunError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RunObject {
    fn into_run(self, path: &str) -> BuddyResult<Run> {
        let last_error = self.last_error.and_then(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        });
        Ok(Run {
            id: non_empty_id(self.id, path)?,
            status: self.status,
            last_error,
        })
    }
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Deserialize)]
struct MessageObject {
    id: String,
    role: Role,
    created_at: i64,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: TextPart },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct TextPart {
    value: String,
}

fn non_empty_id(id: String, path: &str) -> BuddyResult<String> {
    if id.trim().is_empty() {
        return Err(BuddyError::MalformedResponse(format!(
            "{path}: empty id in response"
        )));
    }
    Ok(id)
}

/// Validates a listing and orders it as requested.
///
/// The sort is stable, so messages sharing a `created_at` second keep the
/// service's relative order.
fn parse_message_list(
    list: MessageList,
    order: MessageOrder,
    path: &str,
) -> BuddyResult<Vec<ThreadMessage>> {
    let mut messages = list
        .data
        .into_iter()
        .map(|m| {
            let text = m.content.into_iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.value),
                ContentPart::Other => None,
            });
            Ok(ThreadMessage {
                id: non_empty_id(m.id, path)?,
                role: m.role,
                text,
                created_at: m.created_at,
            })
        })
        .collect::<BuddyResult<Vec<_>>>()?;

    match order {
        MessageOrder::NewestFirst => messages.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        MessageOrder::OldestFirst => messages.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
    Ok(messages)
}

/// Pulls `error.message` out of an API error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
