//! Session state for BibleBuddy.
//!
//! A [`Session`] holds the visible transcript of one browser session together
//! with the lazily created remote assistant and thread ids. Sessions live in a
//! [`SessionStore`] behind a [`SessionHandle`], which also serializes turns and
//! carries the cancellation token that fires when the session ends.

pub mod session;
pub mod store;

pub use session::Session;
pub use store::{InMemorySessionStore, SessionHandle, SessionStore, TurnGuard};
