//! Typed view of the remote assistant service.
//!
//! The service exposes assistants, threads, messages and runs, each addressed
//! by an opaque string id. Backends validate raw payloads at the boundary and
//! hand the rest of the system only these types.

use crate::message::Role;
use crate::BuddyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A capability enabled on a remote assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSpec {
    /// Search over files attached to the assistant or thread.
    FileSearch,
    /// Sandboxed code execution.
    CodeInterpreter,
}

/// Creation payload for a remote assistant definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantSpec {
    /// Display name.
    pub name: String,
    /// Fixed instruction text (the system prompt).
    pub instructions: String,
    /// Model identifier, e.g. `gpt-4o`.
    pub model: String,
    /// Enabled capabilities.
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

/// Lifecycle state of a remote run.
///
/// `queued -> in_progress -> completed | failed`, with `in_progress`
/// repeating across polls. The remaining variants are the other states the
/// service can report; all of them except `requires_action` and
/// `cancelling` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, not yet started.
    Queued,
    /// Executing.
    InProgress,
    /// Waiting on tool outputs from the caller.
    RequiresAction,
    /// Cancellation requested, not yet effective.
    Cancelling,
    /// Cancelled.
    Cancelled,
    /// Failed on the service side.
    Failed,
    /// Finished; the reply is on the thread.
    Completed,
    /// Ended early, e.g. on a token limit.
    Incomplete,
    /// Did not finish within the service's deadline.
    Expired,
}

impl RunStatus {
    /// Whether no further transitions will happen.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Incomplete
                | RunStatus::Expired
        )
    }

    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to one invocation of an assistant against a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Opaque run id.
    pub id: String,
    /// Status as of the last fetch.
    pub status: RunStatus,
    /// Failure detail reported by the service, if any.
    pub last_error: Option<String>,
}

/// A message read back from a remote thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    /// Opaque message id.
    pub id: String,
    /// Author role.
    pub role: Role,
    /// Primary text payload; `None` when the message has no text part.
    pub text: Option<String>,
    /// Creation time in unix seconds.
    pub created_at: i64,
}

/// Requested ordering for [`AssistantService::list_messages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrder {
    /// Most recent message first.
    NewestFirst,
    /// Oldest message first.
    OldestFirst,
}

impl MessageOrder {
    /// Query-string value understood by the service.
    pub fn as_query(self) -> &'static str {
        match self {
            MessageOrder::NewestFirst => "desc",
            MessageOrder::OldestFirst => "asc",
        }
    }
}

/// The remote assistant API.
///
/// Implementations must return messages from `list_messages` in the
/// requested order.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Creates an assistant definition and returns its id.
    async fn create_assistant(&self, spec: &AssistantSpec) -> BuddyResult<String>;

    /// Creates an empty conversation thread and returns its id.
    async fn create_thread(&self) -> BuddyResult<String>;

    /// Appends a message to a thread and returns the new message id.
    async fn create_message(&self, thread_id: &str, role: Role, content: &str)
        -> BuddyResult<String>;

    /// Starts a run of `assistant_id` against `thread_id`.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> BuddyResult<Run>;

    /// Fetches the current state of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> BuddyResult<Run>;

    /// Asks the service to stop a run that is still active.
    ///
    /// A thread rejects new messages while one of its runs is active, so a
    /// run abandoned by the caller must be cancelled before the next turn.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> BuddyResult<Run>;

    /// Lists the messages of a thread in the given order.
    async fn list_messages(
        &self,
        thread_id: &str,
        order: MessageOrder,
    ) -> BuddyResult<Vec<ThreadMessage>>;
}
