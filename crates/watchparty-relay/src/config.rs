//! Relay configuration: TOML file + CLI overrides.

use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::info;
use watchparty_core::{WatchError, WatchResult};

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_max_peers")]
    pub max_peers: usize,
    #[serde(default = "default_true")]
    pub replay_last_command: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            path: default_path(),
            max_peers: default_max_peers(),
            replay_last_command: true,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    watchparty_core::DEFAULT_PORT
}
fn default_path() -> String {
    watchparty_core::DEFAULT_PATH.to_string()
}
fn default_max_peers() -> usize {
    64
}
fn default_true() -> bool {
    true
}

/// Flags that override file values when present.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub max_peers: Option<usize>,
    pub no_replay: bool,
}

/// Resolved relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Websocket path; upgrades on any other path get 404.
    pub path: String,
    pub max_peers: usize,
    /// Send the last playback command to peers as they join.
    pub replay_last_command: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([0, 0, 0, 0]),
            port: default_port(),
            path: default_path(),
            max_peers: default_max_peers(),
            replay_last_command: true,
        }
    }
}

impl RelayConfig {
    /// Load config from TOML file, then apply CLI overrides.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> WatchResult<Self> {
        let file_config = match config_path {
            Some(path) => {
                let expanded = expand_tilde(path);
                if expanded.exists() {
                    info!(path = %expanded.display(), "loading config file");
                    let content = std::fs::read_to_string(&expanded)?;
                    toml::from_str::<ConfigFile>(&content)
                        .map_err(|e| WatchError::Config(format!("config parse error: {e}")))?
                } else {
                    info!(path = %expanded.display(), "config file not found, using defaults");
                    ConfigFile::default()
                }
            }
            None => ConfigFile::default(),
        };

        let server = file_config.server;
        let bind_str = overrides.bind.unwrap_or(server.bind);
        let bind: IpAddr = bind_str
            .parse()
            .map_err(|e| WatchError::Config(format!("invalid bind address '{bind_str}': {e}")))?;

        let config = Self {
            bind,
            port: overrides.port.unwrap_or(server.port),
            path: overrides.path.unwrap_or(server.path),
            max_peers: overrides.max_peers.unwrap_or(server.max_peers),
            replay_last_command: server.replay_last_command && !overrides.no_replay,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WatchResult<()> {
        if !self.path.starts_with('/') {
            return Err(WatchError::Config(format!(
                "path must start with '/': {}",
                self.path
            )));
        }
        if self.max_peers == 0 {
            return Err(WatchError::Config("max_peers must be at least 1".into()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
