//! `biblebuddy.toml` layout.
//!
//! Every section and field has a default, so a partial file (or no file at
//! all) yields a runnable configuration.

use biblebuddy_agent::AssistantConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct BuddyConfig {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_rps")]
    pub max_requests_per_second: f64,
    #[serde(default = "default_burst")]
    pub max_burst: f64,
    #[serde(default = "default_max_msg_len")]
    pub max_message_length: usize,
    /// Sessions untouched for this long are ended by the background sweep.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: default_rps(),
            max_burst: default_burst(),
            max_message_length: default_max_msg_len(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl SecurityConfig {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8501
}
fn default_rps() -> f64 {
    1.0
}
fn default_burst() -> f64 {
    5.0
}
fn default_max_msg_len() -> usize {
    8_000
}
fn default_session_idle_secs() -> u64 {
    3_600
}

impl BuddyConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads the config file, falling back to defaults when it does not exist.
    /// Returns whether the file was found.
    pub async fn load(path: &Path) -> anyhow::Result<(Self, bool)> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok((Self::parse(&text)?, true)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((Self::default(), false)),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            )),
        }
    }
}
