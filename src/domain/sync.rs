//! Sync Entities

use serde::{Deserialize, Serialize};

/// Which way files travel; one direction per invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Remote → local
    Pull,
    /// Local → remote
    Push,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Pull => "pull",
            SyncDirection::Push => "push",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
}

/// Single terminal result of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub message: String,
}

impl SyncOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: SyncStatus::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: SyncStatus::Error, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }
}
