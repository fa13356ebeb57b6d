//! Core types and error definitions for BibleBuddy.
//!
//! This crate provides the foundational types shared across all BibleBuddy
//! crates: the error taxonomy, transcript messages, and the typed boundary
//! to the remote assistant service.
//!
//! # Main types
//!
//! - [`BuddyError`] — Unified error enum for every stage of a chat turn.
//! - [`BuddyResult`] — Convenience alias for `Result<T, BuddyError>`.
//! - [`Role`] — Message role (user, assistant).
//! - [`Message`] — A single entry of the visible chat transcript.
//! - [`AssistantService`] — The remote assistants/threads/runs API.
//! - [`Run`] and [`RunStatus`] — A remote computation and its state machine.

/// Typed boundary to the remote assistant service.
pub mod assistant;
/// Error taxonomy.
pub mod error;
/// Transcript message types.
pub mod message;

pub use assistant::{
    AssistantService, AssistantSpec, MessageOrder, Run, RunStatus, ThreadMessage, ToolSpec,
};
pub use error::{BuddyError, BuddyResult};
pub use message::{Message, Role};
