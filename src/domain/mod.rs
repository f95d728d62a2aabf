//! Domain Layer
//!
//! Entities shared by every component, plus the error taxonomy.
//! This layer has no runtime dependencies (only serde and thiserror).

mod config;
mod error;
pub mod path;
mod prompt;
mod sync;

pub use config::{RemoteSyncConfig, RepositoryConfig, DEFAULT_HOTKEY, DEFAULT_SSH_PORT, DEFAULT_THEME};
pub use error::{CoreError, CoreResult, Refusal};
pub(crate) use error::BackendContext;
pub use prompt::{MnemonicRecord, PromptEntry, ROOT_CATEGORY};
pub use sync::{SyncDirection, SyncOutcome, SyncStatus};
