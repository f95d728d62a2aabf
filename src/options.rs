//! Session Options
//!
//! Client-side timing and display knobs. Unlike [`RepositoryConfig`] these
//! are never persisted by the backend.
//!
//! [`RepositoryConfig`]: crate::domain::RepositoryConfig

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const AUTO_SAVE_DELAY_MS: u64 = 1000;
pub const SETTLE_DELAY_MS: u64 = 100;
pub const PREVIEW_CHARS: usize = 50;

fn default_autosave_delay() -> u64 {
    AUTO_SAVE_DELAY_MS
}

fn default_settle_delay() -> u64 {
    SETTLE_DELAY_MS
}

fn default_preview_chars() -> usize {
    PREVIEW_CHARS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Quiet period after the last edit before autosave fires
    #[serde(default = "default_autosave_delay")]
    pub autosave_delay_ms: u64,
    /// Pause after hiding quick insert so focus can return to the target app
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Characters of content shown in quick-insert previews
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autosave_delay_ms: AUTO_SAVE_DELAY_MS,
            settle_delay_ms: SETTLE_DELAY_MS,
            preview_chars: PREVIEW_CHARS,
        }
    }
}

impl SessionOptions {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Failed to parse options: {}", e))
    }
}
