use crate::poll::{PollPolicy, RunRetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Settings for talking to the hosted assistant service.
#[derive(Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Credential for the service. When unset the app still serves the
    /// page, but every turn fails with a missing-credential error.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub poll: PollPolicy,
    #[serde(default)]
    pub run_retry: RunRetryPolicy,
}

fn default_model_id() -> String {
    "gpt-4o".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            api_key: None,
            api_base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            poll: PollPolicy::default(),
            run_retry: RunRetryPolicy::default(),
        }
    }
}

impl AssistantConfig {
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    /// The configured key, ignoring blank values.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    /// Fills in the key from `fallback` (typically an environment variable)
    /// when the config file did not set one.
    pub fn with_fallback_credential(mut self, fallback: Option<String>) -> Self {
        if !self.has_credential() {
            self.api_key = fallback.filter(|k| !k.trim().is_empty());
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("model_id", &self.model_id)
            .field("api_key", &self.credential().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("poll", &self.poll)
            .field("run_retry", &self.run_retry)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_default_and_override() {
        let mut config = AssistantConfig::default();
        assert_eq!(config.base_url(), "https://api.openai.com");

        config.api_base_url = Some("http://localhost:8080/".into());
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_blank_key_is_not_a_credential() {
        let config = AssistantConfig {
            api_key: Some("   ".into()),
            ..AssistantConfig::default()
        };
        assert!(!config.has_credential());
    }

    #[test]
    fn test_fallback_only_fills_missing_key() {
        let from_env = AssistantConfig::default().with_fallback_credential(Some("sk-env".into()));
        assert_eq!(from_env.credential(), Some("sk-env"));

        let from_file = AssistantConfig {
            api_key: Some("sk-file".into()),
            ..AssistantConfig::default()
        }
        .with_fallback_credential(Some("sk-env".into()));
        assert_eq!(from_file.credential(), Some("sk-file"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = AssistantConfig {
            api_key: Some("sk-secret".into()),
            ..AssistantConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
