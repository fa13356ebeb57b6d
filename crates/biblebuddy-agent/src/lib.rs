//! Turn execution for BibleBuddy.
//!
//! [`TurnCoordinator`] drives one user turn against the remote assistant:
//! post the message, start a run, poll it under a [`PollPolicy`] until it
//! settles, and read the reply back. [`OpenAiAssistantsBackend`] is the HTTP
//! implementation of the service boundary.

pub mod backends;
pub mod config;
pub mod coordinator;
pub mod poll;
pub mod prompt;

pub use backends::openai::OpenAiAssistantsBackend;
pub use config::AssistantConfig;
pub use coordinator::TurnCoordinator;
pub use poll::{PollPolicy, RunRetryPolicy};
pub use prompt::biblebuddy_assistant;
