use crate::backends::openai::OpenAiAssistantsBackend;
use crate::config::AssistantConfig;
use crate::poll::{wait_for_terminal, PollPolicy, RunRetryPolicy};
use crate::prompt::biblebuddy_assistant;
use biblebuddy_core::{
    AssistantService, AssistantSpec, BuddyError, BuddyResult, Message, MessageOrder, Role,
    RunStatus, ThreadMessage,
};
use biblebuddy_session::SessionHandle;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Executes user turns against the remote assistant.
///
/// One turn: post the user message, start a run, poll it to a terminal
/// status, read back the reply. Without a credential every turn fails with
/// [`BuddyError::MissingCredential`] before any remote call.
pub struct TurnCoordinator {
    service: Option<Arc<dyn AssistantService>>,
    assistant: AssistantSpec,
    poll: PollPolicy,
    run_retry: RunRetryPolicy,
}

impl TurnCoordinator {
    pub fn new(service: Arc<dyn AssistantService>, assistant: AssistantSpec) -> Self {
        Self {
            service: Some(service),
            assistant,
            poll: PollPolicy::default(),
            run_retry: RunRetryPolicy::default(),
        }
    }

    /// A coordinator that rejects every turn with a missing-credential error.
    pub fn without_credential(assistant: AssistantSpec) -> Self {
        Self {
            service: None,
            assistant,
            poll: PollPolicy::default(),
            run_retry: RunRetryPolicy::default(),
        }
    }

    /// Builds the OpenAI-backed coordinator, or a credential-less one if no
    /// key is configured.
    pub fn from_config(config: &AssistantConfig) -> BuddyResult<Self> {
        let assistant = biblebuddy_assistant(config.model_id.clone());
        let coordinator = if config.has_credential() {
            let backend = OpenAiAssistantsBackend::new(config)?;
            Self::new(Arc::new(backend), assistant)
        } else {
            warn!("No assistant API key configured; turns will be rejected");
            Self::without_credential(assistant)
        };
        Ok(coordinator
            .with_poll_policy(config.poll.clone())
            .with_run_retry(config.run_retry.clone()))
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_run_retry(mut self, run_retry: RunRetryPolicy) -> Self {
        self.run_retry = run_retry;
        self
    }

    pub fn has_credential(&self) -> bool {
        self.service.is_some()
    }

    pub fn assistant(&self) -> &AssistantSpec {
        &self.assistant
    }

    fn service(&self) -> BuddyResult<&dyn AssistantService> {
        self.service.as_deref().ok_or(BuddyError::MissingCredential)
    }

    /// Runs one user turn on a session and records the exchange.
    ///
    /// The user message is appended before any remote call and stays in the
    /// history when the turn fails; the assistant reply is appended only on
    /// success. A second call while one is outstanding fails with
    /// [`BuddyError::TurnInProgress`]. The session lock is never held across
    /// a remote call, and ending the session stops the turn at the next
    /// remote step with [`BuddyError::Cancelled`].
    pub async fn run_turn(&self, session: &SessionHandle, user_text: &str) -> BuddyResult<String> {
        let _turn = session.try_begin_turn()?;
        let service = self.service()?;
        let session_id = session.id();
        let cancel = session.cancellation();

        let (cached_assistant, cached_thread) = {
            let mut state = session.lock().await;
            state.append(Message::user(user_text))?;
            (
                state.assistant_id().map(str::to_string),
                state.thread_id().map(str::to_string),
            )
        };

        // The turn guard keeps a concurrent turn from creating a second copy.
        let assistant_id = match cached_assistant {
            Some(id) => id,
            None => {
                let id =
                    until_cancelled(&cancel, service.create_assistant(&self.assistant)).await?;
                session.lock().await.remember_assistant(id.clone());
                id
            }
        };
        let thread_id = match cached_thread {
            Some(id) => id,
            None => {
                let id = until_cancelled(&cancel, service.create_thread()).await?;
                session.lock().await.remember_thread(id.clone());
                id
            }
        };

        let reply = match self
            .submit_turn(&thread_id, &assistant_id, user_text, &cancel)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %session_id, thread_id = %thread_id, error = %e, "Turn failed");
                return Err(e);
            }
        };

        let mut state = session.lock().await;
        if cancel.is_cancelled() {
            info!(session_id = %session_id, "Session ended before reply was recorded");
            return Err(BuddyError::Cancelled);
        }
        state.append(Message::assistant(reply.clone()))?;
        info!(
            session_id = %session_id,
            thread_id = %thread_id,
            reply_len = reply.len(),
            "Turn completed"
        );
        Ok(reply)
    }

    /// Sends `user_text` to the thread, runs the assistant and returns its reply.
    ///
    /// A run abandoned on timeout or cancellation is cancelled remotely so
    /// the thread accepts the next message.
    pub async fn submit_turn(
        &self,
        thread_id: &str,
        assistant_id: &str,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> BuddyResult<String> {
        let service = self.service()?;

        let user_message_id = until_cancelled(
            cancel,
            service.create_message(thread_id, Role::User, user_text),
        )
        .await?;

        let mut retry: u32 = 0;
        loop {
            let run = until_cancelled(cancel, service.create_run(thread_id, assistant_id)).await?;
            info!(thread_id, run_id = %run.id, status = %run.status, "Run started");

            let run_id = run.id.clone();
            let run = match wait_for_terminal(service, thread_id, run, &self.poll, cancel).await {
                Ok(run) => run,
                Err(e @ (BuddyError::Timeout { .. } | BuddyError::Cancelled)) => {
                    abandon_run(service, thread_id, &run_id).await;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            // A run already terminal at creation never reaches the poll select.
            if cancel.is_cancelled() {
                return Err(BuddyError::Cancelled);
            }
            if run.status == RunStatus::Completed {
                break;
            }

            warn!(
                thread_id,
                run_id = %run.id,
                status = %run.status,
                reason = run.last_error.as_deref().unwrap_or("none"),
                retry,
                "Run did not complete"
            );
            if retry >= self.run_retry.max_retries {
                return Err(BuddyError::RunFailed {
                    status: run.status,
                    reason: run.last_error,
                });
            }

            let delay = self.run_retry.delay_for(retry);
            info!(thread_id, retry, delay = ?delay, "Retrying failed run");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BuddyError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            retry += 1;
        }

        let messages = until_cancelled(
            cancel,
            service.list_messages(thread_id, MessageOrder::NewestFirst),
        )
        .await?;
        latest_reply(&messages, &user_message_id)
            .map(str::to_string)
            .ok_or(BuddyError::EmptyReply)
    }
}

/// Runs one remote step unless `cancel` fires first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    step: impl Future<Output = BuddyResult<T>>,
) -> BuddyResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BuddyError::Cancelled),
        result = step => result,
    }
}

/// Best-effort remote cancel of a run the turn stopped waiting for.
async fn abandon_run(service: &dyn AssistantService, thread_id: &str, run_id: &str) {
    match service.cancel_run(thread_id, run_id).await {
        Ok(run) => info!(thread_id, run_id, status = %run.status, "Abandoned run cancelled"),
        Err(e) => warn!(thread_id, run_id, error = %e, "Failed to cancel abandoned run"),
    }
}

/// The newest assistant text posted after `user_message_id`.
///
/// `messages` must be newest-first. Only messages above the user's own
/// message are considered, so an earlier turn's reply is never returned for
/// a run that produced nothing. If the user message is not in the listing,
/// the whole listing is searched.
pub fn latest_reply<'a>(messages: &'a [ThreadMessage], user_message_id: &str) -> Option<&'a str> {
    messages
        .iter()
        .take_while(|m| m.id != user_message_id)
        .find(|m| m.role == Role::Assistant)
        .and_then(|m| m.text.as_deref())
        .filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn msg(id: &str, role: Role, text: Option<&str>, created_at: i64) -> ThreadMessage {
        ThreadMessage {
            id: id.to_string(),
            role,
            text: text.map(str::to_string),
            created_at,
        }
    }

    #[test]
    fn test_latest_reply_picks_first_assistant_entry() {
        let listing = vec![
            msg("m4", Role::Assistant, Some("newest"), 4),
            msg("m3", Role::User, Some("question 2"), 3),
            msg("m2", Role::Assistant, Some("older"), 2),
        ];
        assert_eq!(latest_reply(&listing, "m3"), Some("newest"));
    }

    #[test]
    fn test_latest_reply_ignores_previous_turns() {
        let listing = vec![
            msg("m3", Role::User, Some("question 2"), 3),
            msg("m2", Role::Assistant, Some("answer 1"), 2),
            msg("m1", Role::User, Some("question 1"), 1),
        ];
        assert_eq!(latest_reply(&listing, "m3"), None);
    }

    #[test]
    fn test_latest_reply_without_text_part() {
        let listing = vec![
            msg("m2", Role::Assistant, None, 2),
            msg("m1", Role::User, Some("q"), 1),
        ];
        assert_eq!(latest_reply(&listing, "m1"), None);
    }

    #[test]
    fn test_latest_reply_when_user_message_not_listed() {
        let listing = vec![msg("m9", Role::Assistant, Some("reply"), 9)];
        assert_eq!(latest_reply(&listing, "missing"), Some("reply"));
    }

    #[tokio::test]
    async fn test_step_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: BuddyResult<()> = until_cancelled(&cancel, std::future::pending()).await;
        assert!(matches!(result, Err(BuddyError::Cancelled)));

        let live = CancellationToken::new();
        assert_eq!(until_cancelled(&live, async { Ok(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_without_credential_rejects_turn() {
        let coordinator = TurnCoordinator::without_credential(biblebuddy_assistant("gpt-4o"));
        assert!(!coordinator.has_credential());
        let err = coordinator
            .submit_turn("t", "a", "hello", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BuddyError::MissingCredential));
    }
}
