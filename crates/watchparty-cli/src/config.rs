//! Client configuration at `~/.watchparty/config.toml`.
//!
//! Provides the relay address and session tunables.
//! CLI flags always override config file values.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use watchparty_client::{relay_url, Role, SessionConfig};

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub session: SessionSettings,
}

/// Where the relay lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

/// Per-session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Chat display name (empty = use the login name).
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_suppression_window_ms")]
    pub suppression_window_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Length reported by the simulated player for every video.
    #[serde(default = "default_video_duration_secs")]
    pub video_duration_secs: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            role: Role::default(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            suppression_window_ms: default_suppression_window_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            video_duration_secs: default_video_duration_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    watchparty_core::DEFAULT_PORT
}

fn default_path() -> String {
    watchparty_core::DEFAULT_PATH.to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_suppression_window_ms() -> u64 {
    100
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_video_duration_secs() -> f64 {
    600.0
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &str) -> Result<Self> {
        let path = Path::new(path);
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Default location, `~/.watchparty/config.toml`.
    pub fn default_path() -> String {
        let home = dirs::home_dir().unwrap_or_default();
        home.join(".watchparty")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }

    pub fn url(&self) -> String {
        relay_url(&self.relay.host, self.relay.port, &self.relay.path)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            url: self.url(),
            role: self.session.role,
            reconnect_delay: Duration::from_millis(self.session.reconnect_delay_ms),
            suppression_window: Duration::from_millis(self.session.suppression_window_ms),
            poll_interval: Duration::from_millis(self.session.poll_interval_ms.max(1)),
        }
    }

    /// Chat name: configured value, else the login name, else "guest".
    pub fn display_name(&self) -> String {
        let name = self.session.name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "guest".into())
    }
}
