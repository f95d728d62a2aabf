//! Editing Session
//!
//! Owns the repository mirror and serializes every operation that mutates
//! it. All library changes follow the same shape: take the sequence guard,
//! call the backend, reload, then adjust selection.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, Weak};

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::autosave::{AutosaveController, AutosaveState};
use crate::backend::Backend;
use crate::domain::path;
use crate::domain::{
    BackendContext, CoreError, CoreResult, PromptEntry, Refusal, RemoteSyncConfig, RepositoryConfig,
};
use crate::notice::{Notice, Notifier};
use crate::options::SessionOptions;
use crate::store::{
    store_clear_selection, store_find_entry, store_replace_scan, store_select, store_set_mnemonic,
    Draft, Mirror,
};
use crate::tree::{visible_rows, ExpandState, FolderTree, TreeRow};

/// Proof that the holder is the only one mutating the mirror
pub struct SequenceGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Fields of the settings dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub hotkey: String,
    pub theme: String,
    pub autostart: bool,
    pub remote_sync: RemoteSyncConfig,
}

impl From<&RepositoryConfig> for SettingsForm {
    fn from(config: &RepositoryConfig) -> Self {
        Self {
            hotkey: config.hotkey.clone(),
            theme: config.theme.clone(),
            autostart: config.autostart,
            remote_sync: config.remote_sync.clone(),
        }
    }
}

pub struct Session<B: Backend> {
    pub(crate) me: Weak<Session<B>>,
    pub(crate) backend: Arc<B>,
    pub(crate) mirror: Mutex<Mirror>,
    sequence: Mutex<()>,
    expand: StdMutex<ExpandState>,
    pub(crate) autosave: StdMutex<AutosaveController>,
    notifier: Arc<dyn Notifier>,
    pub(crate) options: SessionOptions,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: Arc<B>, notifier: Arc<dyn Notifier>, options: SessionOptions) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            backend,
            mirror: Mutex::new(Mirror::default()),
            sequence: Mutex::new(()),
            expand: StdMutex::new(ExpandState::new()),
            autosave: StdMutex::new(AutosaveController::new()),
            notifier,
            options,
        })
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    // ========================
    // Sequencing and reporting
    // ========================

    /// Wait until no other mutation is in progress
    pub async fn sequence(&self) -> SequenceGuard<'_> {
        SequenceGuard { _guard: self.sequence.lock().await }
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Surface the outcome of an explicit operation
    pub(crate) fn report<T>(&self, result: CoreResult<T>, success: Option<&str>) -> CoreResult<T> {
        match &result {
            Ok(_) => {
                if let Some(message) = success {
                    self.notify(Notice::success(message));
                }
            }
            Err(e) => {
                warn!(error = %e, "operation failed");
                self.notify(Notice::error(e.to_string()));
            }
        }
        result
    }

    pub(crate) fn autosave_lock(&self) -> StdMutexGuard<'_, AutosaveController> {
        self.autosave.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn expand_lock(&self) -> StdMutexGuard<'_, ExpandState> {
        self.expand.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn root(&self) -> CoreResult<String> {
        let mirror = self.mirror.lock().await;
        if mirror.has_root() {
            Ok(mirror.root().to_string())
        } else {
            Err(Refusal::NoRootFolder.into())
        }
    }

    // ========================
    // Loading
    // ========================

    /// Rescan prompts and folders and rebuild the tree
    pub(crate) async fn refresh(&self, _seq: &SequenceGuard<'_>) -> CoreResult<()> {
        let root = self.root().await?;
        let (entries, folders) = tokio::try_join!(
            self.backend.scan_prompts(&root),
            self.backend.scan_folders(&root)
        )
        .during("Load")?;

        let mut mirror = self.mirror.lock().await;
        store_replace_scan(&mut mirror, entries, folders);
        debug!(
            root = %root,
            entries = mirror.entries.len(),
            folders = mirror.folders.len(),
            version = mirror.version,
            "library reloaded"
        );
        Ok(())
    }

    pub async fn reload(&self) -> CoreResult<()> {
        let result = async {
            let seq = self.sequence().await;
            self.refresh(&seq).await
        }
        .await;
        self.report(result, None)
    }

    /// Fetch the persisted config and load the library when a root is set
    pub async fn load_config(&self) -> CoreResult<()> {
        let config = match self.backend.get_config().await.during("Load config") {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "failed to load config");
                return Err(e);
            }
        };
        info!(root = %config.root_folder, "config loaded");

        let has_root = config.has_root();
        {
            let mut mirror = self.mirror.lock().await;
            mirror.config = config;
            store_clear_selection(&mut mirror);
        }
        if has_root {
            self.reload().await?;
        }
        Ok(())
    }

    /// Switch the library to `folder`, persisting the choice
    pub async fn choose_root_folder(&self, folder: &str) -> CoreResult<()> {
        self.flush_pending().await;
        let result = async {
            let seq = self.sequence().await;
            let mut config = self.config().await;
            config.root_folder = folder.to_string();
            self.backend.save_config(&config).await.during("Save settings")?;
            {
                let mut mirror = self.mirror.lock().await;
                mirror.config = config;
                store_clear_selection(&mut mirror);
            }
            self.refresh(&seq).await
        }
        .await;
        self.report(result, Some("Loaded"))
    }

    pub async fn config_path(&self) -> CoreResult<String> {
        self.backend.get_config_path_str().await.during("Config path")
    }

    pub async fn settings_form(&self) -> SettingsForm {
        SettingsForm::from(&self.mirror.lock().await.config)
    }

    /// Apply the settings dialog
    ///
    /// Hotkey, theme and autostart are pushed to the OS only when they
    /// changed; the full config is written last. Whatever was applied before
    /// a failure stays applied.
    pub async fn save_settings(&self, form: SettingsForm) -> CoreResult<()> {
        let hotkey = form.hotkey.trim().to_string();
        if hotkey.is_empty() {
            return self.report(Err(Refusal::EmptyHotkey.into()), None);
        }

        let seq = self.sequence().await;
        let mut config = self.config().await;
        let result = async {
            if hotkey != config.hotkey {
                self.backend.update_hotkey(&hotkey).await.during("Hotkey update")?;
                config.hotkey = hotkey.clone();
            }
            if form.theme != config.theme {
                self.backend.set_window_theme(&form.theme).await.during("Theme")?;
                config.theme = form.theme.clone();
            }
            if form.autostart != config.autostart {
                self.backend.set_autostart(form.autostart).await.during("Autostart")?;
                config.autostart = form.autostart;
            }
            config.remote_sync = form.remote_sync.clone();
            self.backend.save_config(&config).await.during("Save settings")
        }
        .await;

        self.mirror.lock().await.config = config;
        drop(seq);
        self.report(result, Some("Settings saved"))
    }

    // ========================
    // Accessors
    // ========================

    pub async fn config(&self) -> RepositoryConfig {
        self.mirror.lock().await.config.clone()
    }

    pub async fn entries(&self) -> Vec<PromptEntry> {
        self.mirror.lock().await.entries.clone()
    }

    pub async fn entry(&self, file_path: &str) -> Option<PromptEntry> {
        store_find_entry(&*self.mirror.lock().await, file_path).cloned()
    }

    pub async fn folders(&self) -> Vec<String> {
        self.mirror.lock().await.folders.clone()
    }

    pub async fn tree(&self) -> FolderTree {
        self.mirror.lock().await.tree.clone()
    }

    pub async fn selected(&self) -> Option<String> {
        self.mirror.lock().await.selected.clone()
    }

    pub async fn draft(&self) -> Draft {
        self.mirror.lock().await.draft.clone()
    }

    pub async fn version(&self) -> u64 {
        self.mirror.lock().await.version
    }

    pub fn autosave_state(&self) -> AutosaveState {
        self.autosave_lock().state().clone()
    }

    // ========================
    // Tree
    // ========================

    /// Open or close a folder; returns whether it is now open
    pub fn toggle_folder(&self, folder: &str) -> bool {
        self.expand_lock().toggle(folder)
    }

    pub fn is_expanded(&self, folder: &str) -> bool {
        self.expand_lock().is_expanded(folder)
    }

    /// Sidebar rows for the current tree and expand state
    pub async fn rows(&self) -> Vec<TreeRow> {
        let mirror = self.mirror.lock().await;
        let expand = self.expand_lock();
        visible_rows(&mirror.tree, &expand, mirror.selected.as_deref())
    }

    // ========================
    // Selection
    // ========================

    /// Edit an existing entry, saving pending edits of the previous one first
    pub async fn select_entry(&self, file_path: &str) -> CoreResult<()> {
        self.flush_pending().await;
        self.switch_to(file_path).await
    }

    /// Drop into create mode with an empty draft
    pub async fn enter_create_mode(&self) {
        self.flush_pending().await;
        self.autosave_lock().reset();
        store_clear_selection(&mut *self.mirror.lock().await);
    }

    async fn switch_to(&self, file_path: &str) -> CoreResult<()> {
        {
            let mut mirror = self.mirror.lock().await;
            if !store_select(&mut mirror, file_path) {
                return Err(Refusal::UnknownEntry(file_path.to_string()).into());
            }
        }
        self.autosave_lock().reset();

        match self.backend.get_mnemonic_for_file(file_path).await {
            Ok(mnemonic) => {
                let mnemonic = mnemonic.unwrap_or_default();
                let mut mirror = self.mirror.lock().await;
                store_set_mnemonic(&mut mirror, file_path, &mnemonic);
                if mirror.is_selected(file_path) {
                    mirror.draft.mnemonic = mnemonic;
                }
            }
            Err(e) => warn!(file = %file_path, error = %e, "failed to load mnemonic"),
        }
        Ok(())
    }

    // ========================
    // Library changes
    // ========================

    /// New empty prompt in `folder` (the root when `None`), then select it
    pub async fn create_file_in(&self, folder: Option<&str>) -> CoreResult<String> {
        self.flush_pending().await;
        let result = async {
            let seq = self.sequence().await;
            let folder = match folder {
                Some(folder) => folder.to_string(),
                None => self.root().await?,
            };
            let created = self.backend.create_file(&folder).await.during("Create")?;
            self.refresh(&seq).await?;
            drop(seq);
            self.switch_to(&created).await?;
            Ok::<_, CoreError>(created)
        }
        .await;
        self.report(result, Some("Created"))
    }

    /// New folder below `parent` (the root when `None`)
    pub async fn create_folder_in(&self, parent: Option<&str>) -> CoreResult<String> {
        let result = async {
            let seq = self.sequence().await;
            let parent = match parent {
                Some(parent) => parent.to_string(),
                None => self.root().await?,
            };
            let created = self.backend.create_folder(&parent).await.during("Create folder")?;
            self.refresh(&seq).await?;
            Ok::<_, CoreError>(created)
        }
        .await;
        self.report(result, Some("Folder created"))
    }

    /// Rename a folder in place, keeping its expand state and the selection
    ///
    /// An empty or unchanged name does nothing and returns `None`.
    pub async fn rename_folder(&self, folder: &str, new_name: &str) -> CoreResult<Option<String>> {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == path::file_name(folder) {
            return Ok(None);
        }

        self.flush_pending().await;
        let result = async {
            let seq = self.sequence().await;
            self.root().await?;
            let renamed = self.backend.rename_folder(folder, new_name).await.during("Rename")?;

            self.expand_lock().rename_prefix(folder, &renamed);
            {
                let mut mirror = self.mirror.lock().await;
                let moved = mirror
                    .selected
                    .as_deref()
                    .and_then(|s| path::rebase(s, folder, &renamed));
                if moved.is_some() {
                    mirror.selected = moved;
                }
            }
            self.refresh(&seq).await?;
            Ok::<_, CoreError>(Some(renamed))
        }
        .await;
        self.report(result, Some("Renamed"))
    }

    /// Delete a folder and everything in it
    pub async fn delete_folder(&self, folder: &str) -> CoreResult<()> {
        let result = async {
            let seq = self.sequence().await;
            self.root().await?;
            self.backend.delete_folder(folder).await.during("Delete folder")?;

            self.expand_lock().forget_under(folder);
            {
                let mut mirror = self.mirror.lock().await;
                let inside = mirror.selected.as_deref().is_some_and(|s| path::is_within(s, folder));
                if inside {
                    self.autosave_lock().discard_pending();
                    store_clear_selection(&mut mirror);
                }
            }
            self.refresh(&seq).await
        }
        .await;
        self.report(result, Some("Folder deleted"))
    }

    /// Delete one prompt; its mnemonic goes with it
    pub async fn delete_entry(&self, file_path: &str) -> CoreResult<()> {
        let result = async {
            let seq = self.sequence().await;
            self.root().await?;
            self.backend.delete_prompt(file_path).await.during("Delete")?;
            if let Err(e) = self.backend.remove_mnemonic(file_path).await {
                warn!(file = %file_path, error = %e, "failed to remove mnemonic");
            }

            {
                let mut mirror = self.mirror.lock().await;
                if mirror.is_selected(file_path) {
                    self.autosave_lock().discard_pending();
                    store_clear_selection(&mut mirror);
                }
            }
            self.refresh(&seq).await
        }
        .await;
        self.report(result, Some("Deleted"))
    }

    pub async fn open_in_explorer(&self, target: &str) -> CoreResult<()> {
        let result = self.backend.open_in_explorer(target).await.during("Open");
        self.report(result, None)
    }

    /// Copy the draft content to the clipboard
    pub async fn copy_content(&self) -> CoreResult<()> {
        let content = self.mirror.lock().await.draft.content.clone();
        let result = if content.is_empty() {
            Err(Refusal::NothingToCopy.into())
        } else {
            self.backend.copy_to_clipboard(&content).await.during("Copy")
        };
        self.report(result, Some("Copied"))
    }

    // ========================
    // Mnemonics
    // ========================

    /// Update the mnemonic field without persisting it
    pub async fn edit_mnemonic(&self, text: &str) {
        self.mirror.lock().await.draft.mnemonic = text.to_string();
    }

    /// Persist `text` as the mnemonic of the selected entry
    ///
    /// Does nothing in create mode. An empty mnemonic removes the mapping.
    pub async fn commit_mnemonic(&self, text: &str) -> CoreResult<()> {
        let (selected, mnemonic) = {
            let mut mirror = self.mirror.lock().await;
            mirror.draft.mnemonic = text.to_string();
            match &mirror.selected {
                Some(selected) => (selected.clone(), text.trim().to_lowercase()),
                None => return Ok(()),
            }
        };

        let result = if mnemonic.is_empty() {
            self.backend.remove_mnemonic(&selected).await.during("Mnemonic save")
        } else {
            self.backend.set_mnemonic(&selected, &mnemonic).await.during("Mnemonic save")
        };

        if result.is_ok() {
            let mut mirror = self.mirror.lock().await;
            store_set_mnemonic(&mut mirror, &selected, &mnemonic);
            if mirror.is_selected(&selected) {
                mirror.draft.mnemonic = mnemonic;
            }
        }
        self.report(result, None)
    }
}
