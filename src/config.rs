//! Server configuration loaded from `config.toml`.
//!
//! Every field has a default, so an absent file or a partial file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "shellbridge";
const SOCKET_FILE: &str = "shellbridge.sock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Unix socket the extension connects to
    pub socket_path: PathBuf,
    /// Minimum interval between upstream status refreshes
    pub refresh_window_ms: u64,
    /// Maximum simultaneous connections (0 = unlimited)
    pub max_connections: usize,
    /// Capacity of the share-link event queue
    pub event_queue_capacity: usize,
    /// Interval of the shell icon refresh loop
    pub icon_refresh_interval_ms: u64,
    /// Age after which a repo's icon is refreshed even if unchanged
    pub icon_force_refresh_ms: u64,
    /// TOML manifest the sync daemon publishes repo state to
    pub repos_manifest: PathBuf,
    /// Program (and leading arguments) that creates share links
    pub share_link_command: Option<Vec<String>>,
    /// Log destination when running detached
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            socket_path: default_socket_path(),
            refresh_window_ms: 2000,
            max_connections: 100,
            event_queue_capacity: 64,
            icon_refresh_interval_ms: 3000,
            icon_force_refresh_ms: 5000,
            repos_manifest: data_dir.join("repos.toml"),
            share_link_command: None,
            log_file: data_dir.join("shellbridge.log"),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read config file: {}", path.display()))
            }
        }
    }

    pub fn refresh_window(&self) -> Duration {
        Duration::from_millis(self.refresh_window_ms)
    }

    pub fn icon_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.icon_refresh_interval_ms)
    }

    /// PID file kept next to the socket.
    pub fn pid_path(&self) -> PathBuf {
        self.socket_path.with_extension("pid")
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .or_else(|| dirs::home_dir().map(|home| home.join(format!(".{APP_DIR}"))))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_socket_path() -> PathBuf {
    match dirs::runtime_dir() {
        Some(dir) => dir.join(SOCKET_FILE),
        None => dirs::home_dir()
            .map(|home| home.join(format!(".{APP_DIR}")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SOCKET_FILE),
    }
}
