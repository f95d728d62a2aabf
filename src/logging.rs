//! Logging bootstrap

use std::path::Path;

pub const APP_NAME: &str = "PromptManager";

/// Install the rolling file logger under `log_dir`; fails if one is already installed
pub fn init(log_dir: impl AsRef<Path>) -> Result<(), String> {
    rolling_logger::init_logger(log_dir, APP_NAME)
}

/// Most recent formatted log lines, oldest first
pub fn recent_lines(n: usize) -> Vec<String> {
    rolling_logger::recent(n)
}
