//! Backend Contract
//!
//! Every storage, transport and OS-integration call the core makes.
//! Rejections carry a single human-readable message.

use async_trait::async_trait;

use crate::domain::{MnemonicRecord, PromptEntry, RepositoryConfig, SyncOutcome};

pub type BackendResult<T> = Result<T, String>;

/// Storage and transport operations consumed by the core
///
/// All operations are async and none can be cancelled from the caller's
/// side once issued.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    // ========================
    // Configuration
    // ========================

    async fn get_config(&self) -> BackendResult<RepositoryConfig>;

    /// Replace the persisted config wholesale
    async fn save_config(&self, config: &RepositoryConfig) -> BackendResult<()>;

    async fn get_config_path_str(&self) -> BackendResult<String>;

    // ========================
    // Library scanning
    // ========================

    async fn scan_prompts(&self, root_folder: &str) -> BackendResult<Vec<PromptEntry>>;

    /// Absolute paths of every folder below the root (the root excluded)
    async fn scan_folders(&self, root_folder: &str) -> BackendResult<Vec<String>>;

    // ========================
    // Mnemonics
    // ========================

    async fn get_mnemonic_for_file(&self, file_path: &str) -> BackendResult<Option<String>>;

    async fn set_mnemonic(&self, file_path: &str, mnemonic: &str) -> BackendResult<()>;

    async fn remove_mnemonic(&self, file_path: &str) -> BackendResult<()>;

    async fn get_all_mnemonics(&self) -> BackendResult<Vec<MnemonicRecord>>;

    // ========================
    // Files and folders
    // ========================

    /// Create, update or rename-and-update; returns the resulting path
    async fn save_prompt(
        &self,
        root_folder: &str,
        category: &str,
        title: &str,
        content: &str,
        original_path: Option<&str>,
    ) -> BackendResult<String>;

    async fn delete_prompt(&self, file_path: &str) -> BackendResult<()>;

    /// Create an empty prompt with a default name; returns its path
    async fn create_file(&self, folder: &str) -> BackendResult<String>;

    /// Create a folder with a default name; returns its path
    async fn create_folder(&self, parent_folder: &str) -> BackendResult<String>;

    /// Returns the renamed folder's path
    async fn rename_folder(&self, old_path: &str, new_name: &str) -> BackendResult<String>;

    async fn delete_folder(&self, folder_path: &str) -> BackendResult<()>;

    async fn open_in_explorer(&self, path: &str) -> BackendResult<()>;

    // ========================
    // Clipboard and input
    // ========================

    async fn copy_to_clipboard(&self, text: &str) -> BackendResult<()>;

    async fn read_clipboard(&self) -> BackendResult<String>;

    /// Insert text into the focused application in one go
    async fn type_text(&self, text: &str) -> BackendResult<()>;

    /// Insert text keystroke by keystroke
    async fn type_text_simulate(&self, text: &str) -> BackendResult<()>;

    async fn hide_popup(&self) -> BackendResult<()>;

    // ========================
    // OS integration
    // ========================

    async fn update_hotkey(&self, new_hotkey: &str) -> BackendResult<()>;

    async fn set_autostart(&self, enable: bool) -> BackendResult<()>;

    async fn set_window_theme(&self, theme: &str) -> BackendResult<()>;

    // ========================
    // Remote sync
    // ========================

    async fn sync_pull(
        &self,
        local_folder: &str,
        server: &str,
        remote_path: &str,
        port: u16,
    ) -> BackendResult<SyncOutcome>;

    async fn sync_push(
        &self,
        local_folder: &str,
        server: &str,
        remote_path: &str,
        port: u16,
    ) -> BackendResult<SyncOutcome>;

    async fn test_ssh_connection(&self, server: &str, port: u16) -> BackendResult<String>;

    async fn check_ssh_available(&self) -> BackendResult<bool>;
}
