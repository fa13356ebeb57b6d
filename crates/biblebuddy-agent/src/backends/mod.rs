//! Implementations of [`biblebuddy_core::AssistantService`].
//!
//! To add a provider: create a module here, implement `AssistantService` for
//! it, and select it in `TurnCoordinator::from_config`.

pub mod openai;
