//! Error Taxonomy
//!
//! Two kinds only: a local refusal decided before any backend contact, or a
//! backend rejection carrying the backend's message.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Client-side precondition that was not met
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("Choose a prompts folder first")]
    NoRootFolder,
    #[error("Enter a title")]
    EmptyTitle,
    #[error("Nothing is selected")]
    NothingSelected,
    #[error("Nothing to copy")]
    NothingToCopy,
    #[error("Hotkey cannot be empty")]
    EmptyHotkey,
    #[error("Enter a server address")]
    EmptyServer,
    #[error("Enable remote sync in settings first")]
    SyncDisabled,
    #[error("Configure the server address and remote path first")]
    SyncTargetIncomplete,
    #[error("A sync is already running")]
    SyncBusy,
    #[error("No prompt at {0}")]
    UnknownEntry(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Refused(#[from] Refusal),
    /// `action` is the user-facing verb ("Save", "Delete", ...)
    #[error("{action} failed: {message}")]
    Backend { action: &'static str, message: String },
}

impl CoreError {
    pub fn backend(action: &'static str, message: impl Into<String>) -> Self {
        CoreError::Backend { action, message: message.into() }
    }

    pub fn is_refusal(&self) -> bool {
        matches!(self, CoreError::Refused(_))
    }
}

/// Attach the user-facing action to a backend `Result<T, String>`
pub(crate) trait BackendContext<T> {
    fn during(self, action: &'static str) -> CoreResult<T>;
}

impl<T> BackendContext<T> for Result<T, String> {
    fn during(self, action: &'static str) -> CoreResult<T> {
        self.map_err(|message| CoreError::backend(action, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        let refused: CoreError = Refusal::SyncDisabled.into();
        assert_eq!(refused.to_string(), "Enable remote sync in settings first");
        assert!(refused.is_refusal());

        let failed = Err::<(), _>("disk full".to_string()).during("Save").unwrap_err();
        assert_eq!(failed.to_string(), "Save failed: disk full");
        assert!(!failed.is_refusal());
    }
}
