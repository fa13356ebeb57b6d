use crate::assistant::RunStatus;
use thiserror::Error;
use uuid::Uuid;

/// A convenience `Result` alias using [`BuddyError`].
pub type BuddyResult<T> = Result<T, BuddyError>;

/// Everything that can end a chat turn early.
///
/// Every variant is terminal for the current turn only; the session that
/// produced it stays usable.
#[derive(Error, Debug)]
pub enum BuddyError {
    /// No API key was supplied, so no remote call can be made.
    #[error("No assistant API key configured")]
    MissingCredential,

    /// The assistant service rejected the configured credential.
    #[error("Assistant service rejected the credential: {0}")]
    Unauthorized(String),

    /// The remote run reached a terminal state other than `completed`.
    #[error("Run ended with status {status}{}", reason_suffix(.reason))]
    RunFailed {
        /// Terminal status reported by the service.
        status: RunStatus,
        /// The service's `last_error.message`, when present.
        reason: Option<String>,
    },

    /// The run completed but produced no assistant text.
    #[error("Run completed without an assistant reply")]
    EmptyReply,

    /// The poll budget ran out before the run reached a terminal state.
    #[error("Run did not finish after {attempts} polls ({elapsed_ms} ms)")]
    Timeout {
        /// Number of status polls issued.
        attempts: u32,
        /// Wall-clock time spent waiting.
        elapsed_ms: u64,
    },

    /// A remote payload did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Another turn is still running on the same session.
    #[error("A turn is already in progress for this session")]
    TurnInProgress,

    /// The session ended while the turn was waiting on the run.
    #[error("Turn cancelled")]
    Cancelled,

    /// The user message had no content.
    #[error("Message content must not be empty")]
    EmptyMessage,

    /// No live session has the given id.
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// Transport failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

impl BuddyError {
    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            BuddyError::MissingCredential => "missing_credential",
            BuddyError::Unauthorized(_) => "unauthorized",
            BuddyError::RunFailed { .. } => "run_failed",
            BuddyError::EmptyReply => "empty_reply",
            BuddyError::Timeout { .. } => "timeout",
            BuddyError::MalformedResponse(_) => "malformed_response",
            BuddyError::TurnInProgress => "turn_in_progress",
            BuddyError::Cancelled => "cancelled",
            BuddyError::EmptyMessage => "empty_message",
            BuddyError::SessionNotFound(_) => "session_not_found",
            BuddyError::Http(_) => "http",
            BuddyError::Config(_) => "config",
            BuddyError::Json(_) => "json",
            BuddyError::Io(_) => "io",
        }
    }

    /// Whether submitting the same turn again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BuddyError::RunFailed { .. } | BuddyError::Timeout { .. } | BuddyError::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_failed_display_includes_reason() {
        let err = BuddyError::RunFailed {
            status: RunStatus::Failed,
            reason: Some("rate limit exceeded".into()),
        };
        assert_eq!(
            err.to_string(),
            "Run ended with status failed: rate limit exceeded"
        );

        let bare = BuddyError::RunFailed {
            status: RunStatus::Expired,
            reason: None,
        };
        assert_eq!(bare.to_string(), "Run ended with status expired");
    }

    #[test]
    fn retryable_classification() {
        assert!(BuddyError::Timeout {
            attempts: 3,
            elapsed_ms: 10
        }
        .is_retryable());
        assert!(BuddyError::Http("503".into()).is_retryable());
        assert!(!BuddyError::MissingCredential.is_retryable());
        assert!(!BuddyError::EmptyReply.is_retryable());
        assert!(!BuddyError::TurnInProgress.is_retryable());
    }

    #[test]
    fn kinds_are_snake_case() {
        assert_eq!(BuddyError::EmptyReply.kind(), "empty_reply");
        assert_eq!(
            BuddyError::SessionNotFound(Uuid::nil()).kind(),
            "session_not_found"
        );
    }
}
