//! Prompt Manager Core
//!
//! Client-side logic of a personal prompt library: a mirror of the on-disk
//! folder hierarchy, debounced autosave, mnemonic quick insert and remote
//! sync. Storage, SSH, clipboard and OS integration sit behind the
//! [`Backend`] trait.

pub mod autosave;
pub mod backend;
pub mod domain;
pub mod logging;
pub mod notice;
pub mod options;
pub mod quick_insert;
pub mod session;
pub mod store;
pub mod sync;
pub mod tree;

pub use autosave::{AutosaveController, AutosaveState, SaveMode};
pub use backend::{Backend, BackendResult, MemoryBackend};
pub use domain::{
    CoreError, CoreResult, MnemonicRecord, PromptEntry, Refusal, RemoteSyncConfig,
    RepositoryConfig, SyncDirection, SyncOutcome, SyncStatus,
};
pub use notice::{Notice, NoticeLevel, NoticeLog, Notifier, TracingNotifier};
pub use options::SessionOptions;
pub use quick_insert::{InsertMode, KeyOutcome, QuickInsert, QuickKey, QuickRow};
pub use session::{SequenceGuard, Session, SettingsForm};
pub use store::{Draft, Mirror};
pub use sync::{SyncOrchestrator, SyncState, SyncTarget, TransportStatus};
pub use tree::{ExpandState, FolderTree, TreeRow};
