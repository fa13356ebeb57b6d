//! HTTP surface for BibleBuddy.
//!
//! Serves the chat page and a small JSON API over the session store and the
//! turn coordinator, with per-session rate limiting, input sanitizing and a
//! background sweep of idle sessions.

pub mod error;
pub mod markdown;
pub mod page;
pub mod rate_limit;
pub mod reaper;
pub mod sanitizer;
pub mod server;

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use reaper::spawn_idle_reaper;
pub use sanitizer::Sanitizer;
pub use server::{AppState, GatewayServer};
