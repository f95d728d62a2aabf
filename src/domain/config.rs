//! Repository Configuration
//!
//! Backend-owned settings. The client keeps a full copy and always writes
//! the whole struct back; there is no partial update.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HOTKEY: &str = "Alt+Space";
pub const DEFAULT_THEME: &str = "dark";
pub const DEFAULT_SSH_PORT: u16 = 22;

fn default_hotkey() -> String {
    DEFAULT_HOTKEY.to_string()
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Library root; empty until the user picks one
    #[serde(default)]
    pub root_folder: String,
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub remote_sync: RemoteSyncConfig,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root_folder: String::new(),
            hotkey: default_hotkey(),
            theme: default_theme(),
            autostart: false,
            remote_sync: RemoteSyncConfig::default(),
        }
    }
}

impl RepositoryConfig {
    pub fn has_root(&self) -> bool {
        !self.root_folder.trim().is_empty()
    }

    /// Parse a persisted config, filling in defaults for missing fields
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Failed to parse config: {}", e))
    }

    pub fn to_json_pretty(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))
    }
}

/// Remote copy reached over SSH/SCP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSyncConfig {
    #[serde(default)]
    pub enabled: bool,
    /// `user@host` or plain host
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub remote_path: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for RemoteSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: String::new(),
            remote_path: String::new(),
            port: DEFAULT_SSH_PORT,
        }
    }
}

impl RemoteSyncConfig {
    /// Port to hand to the transport; 0 means "not set"
    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_SSH_PORT
        } else {
            self.port
        }
    }
}
