use biblebuddy_core::{AssistantService, AssistantSpec, BuddyError, BuddyResult, Message};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Conversation state of one browser session.
///
/// The remote ids are created on first use and cached for the lifetime of
/// the session, so each is created at most once.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    messages: Vec<Message>,
    thread_id: Option<String>,
    assistant_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            thread_id: None,
            assistant_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the cached assistant id, creating the assistant on first call.
    pub async fn get_or_create_assistant(
        &mut self,
        service: &dyn AssistantService,
        spec: &AssistantSpec,
    ) -> BuddyResult<String> {
        if let Some(id) = &self.assistant_id {
            return Ok(id.clone());
        }
        let id = service.create_assistant(spec).await?;
        self.remember_assistant(id.clone());
        Ok(id)
    }

    /// Returns the cached thread id, creating the thread on first call.
    pub async fn get_or_create_thread(
        &mut self,
        service: &dyn AssistantService,
    ) -> BuddyResult<String> {
        if let Some(id) = &self.thread_id {
            return Ok(id.clone());
        }
        let id = service.create_thread().await?;
        self.remember_thread(id.clone());
        Ok(id)
    }

    /// Caches an assistant created without this session's lock held.
    pub fn remember_assistant(&mut self, id: String) {
        info!(session_id = %self.id, assistant_id = %id, "Assistant created");
        self.assistant_id = Some(id);
    }

    pub fn remember_thread(&mut self, id: String) {
        info!(session_id = %self.id, thread_id = %id, "Thread created");
        self.thread_id = Some(id);
    }

    /// Appends a message to the transcript. Blank content is rejected.
    pub fn append(&mut self, message: Message) -> BuddyResult<()> {
        if message.content.trim().is_empty() {
            return Err(BuddyError::EmptyMessage);
        }
        self.updated_at = Utc::now();
        self.messages.push(message);
        Ok(())
    }

    /// The full transcript in conversational order.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant_id.as_deref()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
