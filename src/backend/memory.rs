//! In-Memory Backend
//!
//! Emulates the desktop storage backend without touching the disk: prompt
//! files, folders, mnemonic metadata, clipboard, typed output and a remote
//! copy for pull/push. Every call is recorded, any operation can be made to
//! fail or panic, and saves/syncs can be slowed down to exercise overlapping calls.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{Backend, BackendResult};
use crate::domain::path;
use crate::domain::{MnemonicRecord, PromptEntry, RepositoryConfig, SyncOutcome, ROOT_CATEGORY};

const PROMPT_EXTENSIONS: [&str; 2] = ["md", "txt"];
const DEFAULT_EXTENSION: &str = "md";
const NEW_FILE_STEM: &str = "New Prompt";
const NEW_FOLDER_NAME: &str = "New Folder";

/// How a piece of text reached the focused application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedVia {
    Paste,
    Keystrokes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedText {
    pub via: TypedVia,
    pub text: String,
}

struct MemoryState {
    config_json: String,
    config_path: String,
    files: BTreeMap<String, String>,
    folders: BTreeSet<String>,
    /// mnemonic -> file path
    mnemonics: HashMap<String, String>,
    /// relative path -> content
    remote: BTreeMap<String, String>,
    clipboard: String,
    typed: Vec<TypedText>,
    opened: Vec<String>,
    calls: Vec<&'static str>,
    failures: HashMap<&'static str, String>,
    panics: BTreeSet<&'static str>,
    theme: Option<String>,
    popup_hides: usize,
    ssh_available: bool,
    save_delay: Duration,
    sync_delay: Duration,
}

pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    saves_in_flight: AtomicUsize,
    max_saves_in_flight: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_id(file_path: &str) -> String {
    let mut hasher = DefaultHasher::new();
    file_path.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

fn is_prompt_file(file_path: &str) -> bool {
    path::extension(file_path)
        .map(|ext| PROMPT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl MemoryState {
    fn config(&self) -> RepositoryConfig {
        if self.config_json.is_empty() {
            RepositoryConfig::default()
        } else {
            RepositoryConfig::from_json(&self.config_json).unwrap_or_default()
        }
    }

    fn store_config(&mut self, config: &RepositoryConfig) -> BackendResult<()> {
        self.config_json = config.to_json_pretty()?;
        Ok(())
    }

    fn root(&self) -> String {
        path::normalize(&self.config().root_folder)
    }

    fn folder_exists(&self, folder: &str) -> bool {
        let folder = path::normalize(folder);
        (!folder.is_empty() && folder == self.root()) || self.folders.contains(&folder)
    }

    /// Register every folder between the root and `file_path`'s parent
    fn ensure_parents(&mut self, file_path: &str) {
        let root = self.root();
        let mut current = path::parent(file_path);
        while let Some(folder) = current {
            if folder == root || folder == "/" || path::relative_to(&root, &folder).is_none() {
                break;
            }
            current = path::parent(&folder);
            self.folders.insert(folder);
        }
    }

    fn mnemonic_of(&self, file_path: &str) -> Option<String> {
        self.mnemonics
            .iter()
            .find(|(_, p)| path::same_path(p, file_path))
            .map(|(m, _)| m.clone())
    }

    fn drop_mnemonics_under(&mut self, folder: &str) {
        self.mnemonics.retain(|_, p| !path::is_within(p, folder));
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                config_json: String::new(),
                config_path: "/home/user/.config/prompt-manager/config.json".to_string(),
                files: BTreeMap::new(),
                folders: BTreeSet::new(),
                mnemonics: HashMap::new(),
                remote: BTreeMap::new(),
                clipboard: String::new(),
                typed: Vec::new(),
                opened: Vec::new(),
                calls: Vec::new(),
                failures: HashMap::new(),
                panics: BTreeSet::new(),
                theme: None,
                popup_hides: 0,
                ssh_available: true,
                save_delay: Duration::ZERO,
                sync_delay: Duration::ZERO,
            }),
            saves_in_flight: AtomicUsize::new(0),
            max_saves_in_flight: AtomicUsize::new(0),
        }
    }

    /// Backend whose persisted config already points at `root`
    pub fn with_root(root: &str) -> Self {
        let backend = Self::new();
        backend.update_config(|c| c.root_folder = root.to_string());
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked while holding it
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and return the injected failure, if any
    fn record(&self, op: &'static str) -> BackendResult<()> {
        let mut state = self.lock();
        state.calls.push(op);
        if state.panics.contains(op) {
            drop(state);
            panic!("{} panicked", op);
        }
        match state.failures.get(op) {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }

    // ========================
    // Test setup
    // ========================

    pub fn update_config(&self, f: impl FnOnce(&mut RepositoryConfig)) {
        let mut state = self.lock();
        let mut config = state.config();
        f(&mut config);
        state.store_config(&config).expect("config serializes");
    }

    pub fn add_file(&self, file_path: &str, content: &str) {
        let mut state = self.lock();
        let file_path = path::normalize(file_path);
        state.ensure_parents(&file_path);
        state.files.insert(file_path, content.to_string());
    }

    pub fn add_folder(&self, folder: &str) {
        let mut state = self.lock();
        let folder = path::normalize(folder);
        state.ensure_parents(&folder);
        state.folders.insert(folder);
    }

    pub fn add_remote_file(&self, relative: &str, content: &str) {
        self.lock().remote.insert(relative.to_string(), content.to_string());
    }

    pub fn assign_mnemonic(&self, file_path: &str, mnemonic: &str) {
        self.lock()
            .mnemonics
            .insert(mnemonic.to_string(), path::normalize(file_path));
    }

    /// Make every later call of `op` fail with `message`
    pub fn fail(&self, op: &'static str, message: &str) {
        self.lock().failures.insert(op, message.to_string());
    }

    /// Make `op` panic instead of returning
    pub fn panic_on(&self, op: &'static str) {
        self.lock().panics.insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        let mut state = self.lock();
        state.failures.remove(op);
        state.panics.remove(op);
    }

    pub fn set_save_delay(&self, delay: Duration) {
        self.lock().save_delay = delay;
    }

    pub fn set_sync_delay(&self, delay: Duration) {
        self.lock().sync_delay = delay;
    }

    pub fn set_ssh_available(&self, available: bool) {
        self.lock().ssh_available = available;
    }

    pub fn set_clipboard(&self, text: &str) {
        self.lock().clipboard = text.to_string();
    }

    // ========================
    // Inspection
    // ========================

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn file(&self, file_path: &str) -> Option<String> {
        self.lock().files.get(&path::normalize(file_path)).cloned()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    pub fn folder_paths(&self) -> Vec<String> {
        self.lock().folders.iter().cloned().collect()
    }

    pub fn remote_files(&self) -> BTreeMap<String, String> {
        self.lock().remote.clone()
    }

    pub fn mnemonic(&self, file_path: &str) -> Option<String> {
        self.lock().mnemonic_of(file_path)
    }

    pub fn stored_config(&self) -> RepositoryConfig {
        self.lock().config()
    }

    pub fn typed(&self) -> Vec<TypedText> {
        self.lock().typed.clone()
    }

    pub fn clipboard(&self) -> String {
        self.lock().clipboard.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    pub fn theme(&self) -> Option<String> {
        self.lock().theme.clone()
    }

    pub fn popup_hides(&self) -> usize {
        self.lock().popup_hides
    }

    /// Highest number of `save_prompt` calls that overlapped
    pub fn max_saves_in_flight(&self) -> usize {
        self.max_saves_in_flight.load(Ordering::SeqCst)
    }

    fn write_prompt(
        &self,
        root_folder: &str,
        category: &str,
        title: &str,
        content: &str,
        original_path: Option<&str>,
    ) -> BackendResult<String> {
        let mut state = self.lock();

        let mut target_folder = path::normalize(root_folder);
        if category != ROOT_CATEGORY {
            for segment in path::segments(&path::normalize(category)) {
                target_folder = path::join(&target_folder, segment);
                state.folders.insert(target_folder.clone());
            }
        }

        let ext = original_path
            .and_then(path::extension)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let target = path::join(&target_folder, &format!("{}.{}", title, ext));

        if let Some(original) = original_path {
            let original = path::normalize(original);
            if original != target {
                state.files.remove(&original);
            }
        }

        state.files.insert(target.clone(), content.to_string());
        Ok(target)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_config(&self) -> BackendResult<RepositoryConfig> {
        self.record("get_config")?;
        Ok(self.lock().config())
    }

    async fn save_config(&self, config: &RepositoryConfig) -> BackendResult<()> {
        self.record("save_config")?;
        self.lock().store_config(config)
    }

    async fn get_config_path_str(&self) -> BackendResult<String> {
        self.record("get_config_path_str")?;
        Ok(self.lock().config_path.clone())
    }

    async fn scan_prompts(&self, root_folder: &str) -> BackendResult<Vec<PromptEntry>> {
        self.record("scan_prompts")?;
        let state = self.lock();
        if !state.folder_exists(root_folder) {
            return Err("Folder does not exist".to_string());
        }

        let entries = state
            .files
            .iter()
            .filter(|(p, _)| is_prompt_file(p))
            .filter_map(|(p, content)| {
                let relative = path::relative_to(root_folder, p)?;
                let category =
                    path::parent(&relative).unwrap_or_else(|| ROOT_CATEGORY.to_string());
                Some(PromptEntry::new(
                    entry_id(p),
                    path::file_stem(p),
                    content.clone(),
                    p.clone(),
                    category,
                ))
            })
            .collect();
        Ok(entries)
    }

    async fn scan_folders(&self, root_folder: &str) -> BackendResult<Vec<String>> {
        self.record("scan_folders")?;
        let state = self.lock();
        if !state.folder_exists(root_folder) {
            return Err("Folder does not exist".to_string());
        }
        let root = path::normalize(root_folder);
        Ok(state
            .folders
            .iter()
            .filter(|f| **f != root && path::is_within(f, &root))
            .cloned()
            .collect())
    }

    async fn get_mnemonic_for_file(&self, file_path: &str) -> BackendResult<Option<String>> {
        self.record("get_mnemonic_for_file")?;
        Ok(self.lock().mnemonic_of(file_path))
    }

    async fn set_mnemonic(&self, file_path: &str, mnemonic: &str) -> BackendResult<()> {
        self.record("set_mnemonic")?;
        let mnemonic = mnemonic.trim().to_lowercase();
        if mnemonic.is_empty() {
            return Err("Mnemonic cannot be empty".to_string());
        }

        let mut state = self.lock();
        if let Some(existing) = state.mnemonics.get(&mnemonic) {
            if !path::same_path(existing, file_path) {
                return Err(format!("Mnemonic '{}' is already used by another file", mnemonic));
            }
        }
        state.mnemonics.retain(|_, p| !path::same_path(p, file_path));
        state.mnemonics.insert(mnemonic, path::normalize(file_path));
        Ok(())
    }

    async fn remove_mnemonic(&self, file_path: &str) -> BackendResult<()> {
        self.record("remove_mnemonic")?;
        self.lock().mnemonics.retain(|_, p| !path::same_path(p, file_path));
        Ok(())
    }

    async fn get_all_mnemonics(&self) -> BackendResult<Vec<MnemonicRecord>> {
        self.record("get_all_mnemonics")?;
        let state = self.lock();
        let root = state.root();
        if root.is_empty() {
            return Ok(Vec::new());
        }

        let mut records: Vec<MnemonicRecord> = state
            .files
            .iter()
            .filter(|(p, _)| is_prompt_file(p) && path::is_within(p, &root))
            .map(|(p, content)| {
                MnemonicRecord::new(
                    state.mnemonic_of(p).unwrap_or_default(),
                    path::file_stem(p),
                    content.clone(),
                )
            })
            .collect();
        records.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(records)
    }

    async fn save_prompt(
        &self,
        root_folder: &str,
        category: &str,
        title: &str,
        content: &str,
        original_path: Option<&str>,
    ) -> BackendResult<String> {
        self.record("save_prompt")?;
        let delay = self.lock().save_delay;

        let now = self.saves_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_saves_in_flight.fetch_max(now, Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = self.write_prompt(root_folder, category, title, content, original_path);
        self.saves_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete_prompt(&self, file_path: &str) -> BackendResult<()> {
        self.record("delete_prompt")?;
        let mut state = self.lock();
        match state.files.remove(&path::normalize(file_path)) {
            Some(_) => Ok(()),
            None => Err("File not found".to_string()),
        }
    }

    async fn create_file(&self, folder: &str) -> BackendResult<String> {
        self.record("create_file")?;
        let mut state = self.lock();
        if !state.folder_exists(folder) {
            return Err("Folder does not exist".to_string());
        }

        let mut index = 1;
        let file_path = loop {
            let name = if index == 1 {
                format!("{}.{}", NEW_FILE_STEM, DEFAULT_EXTENSION)
            } else {
                format!("{} {}.{}", NEW_FILE_STEM, index, DEFAULT_EXTENSION)
            };
            let candidate = path::join(folder, &name);
            if !state.files.contains_key(&candidate) {
                break candidate;
            }
            index += 1;
        };

        state.files.insert(file_path.clone(), String::new());
        Ok(file_path)
    }

    async fn create_folder(&self, parent_folder: &str) -> BackendResult<String> {
        self.record("create_folder")?;
        let mut state = self.lock();
        if !state.folder_exists(parent_folder) {
            return Err("Parent folder does not exist".to_string());
        }

        let mut index = 1;
        let folder = loop {
            let name = if index == 1 {
                NEW_FOLDER_NAME.to_string()
            } else {
                format!("{} {}", NEW_FOLDER_NAME, index)
            };
            let candidate = path::join(parent_folder, &name);
            if !state.folders.contains(&candidate) {
                break candidate;
            }
            index += 1;
        };

        state.folders.insert(folder.clone());
        Ok(folder)
    }

    async fn rename_folder(&self, old_path: &str, new_name: &str) -> BackendResult<String> {
        self.record("rename_folder")?;
        let mut state = self.lock();
        let old_path = path::normalize(old_path);
        if !state.folders.contains(&old_path) {
            return Err("Folder does not exist".to_string());
        }
        let parent = path::parent(&old_path).ok_or("Cannot resolve parent folder")?;
        let new_path = path::join(&parent, new_name);
        if state.folders.contains(&new_path) || state.files.contains_key(&new_path) {
            return Err("Target name already exists".to_string());
        }

        let folders: BTreeSet<String> = state
            .folders
            .iter()
            .map(|f| path::rebase(f, &old_path, &new_path).unwrap_or_else(|| f.clone()))
            .collect();
        let files: BTreeMap<String, String> = state
            .files
            .iter()
            .map(|(p, c)| (path::rebase(p, &old_path, &new_path).unwrap_or_else(|| p.clone()), c.clone()))
            .collect();
        for p in state.mnemonics.values_mut() {
            if let Some(moved) = path::rebase(p, &old_path, &new_path) {
                *p = moved;
            }
        }
        state.folders = folders;
        state.files = files;
        Ok(new_path)
    }

    async fn delete_folder(&self, folder_path: &str) -> BackendResult<()> {
        self.record("delete_folder")?;
        let mut state = self.lock();
        let folder = path::normalize(folder_path);
        if !state.folders.contains(&folder) {
            return Err("Folder does not exist".to_string());
        }
        state.folders.retain(|f| !path::is_within(f, &folder));
        state.files.retain(|p, _| !path::is_within(p, &folder));
        state.drop_mnemonics_under(&folder);
        Ok(())
    }

    async fn open_in_explorer(&self, target: &str) -> BackendResult<()> {
        self.record("open_in_explorer")?;
        self.lock().opened.push(path::normalize(target));
        Ok(())
    }

    async fn copy_to_clipboard(&self, text: &str) -> BackendResult<()> {
        self.record("copy_to_clipboard")?;
        self.lock().clipboard = text.to_string();
        Ok(())
    }

    async fn read_clipboard(&self) -> BackendResult<String> {
        self.record("read_clipboard")?;
        Ok(self.lock().clipboard.clone())
    }

    async fn type_text(&self, text: &str) -> BackendResult<()> {
        self.record("type_text")?;
        let mut state = self.lock();
        // Pasting goes through the clipboard
        state.clipboard = text.to_string();
        state.typed.push(TypedText { via: TypedVia::Paste, text: text.to_string() });
        Ok(())
    }

    async fn type_text_simulate(&self, text: &str) -> BackendResult<()> {
        self.record("type_text_simulate")?;
        self.lock()
            .typed
            .push(TypedText { via: TypedVia::Keystrokes, text: text.to_string() });
        Ok(())
    }

    async fn hide_popup(&self) -> BackendResult<()> {
        self.record("hide_popup")?;
        self.lock().popup_hides += 1;
        Ok(())
    }

    async fn update_hotkey(&self, new_hotkey: &str) -> BackendResult<()> {
        self.record("update_hotkey")?;
        let mut state = self.lock();
        let mut config = state.config();
        config.hotkey = new_hotkey.to_string();
        state.store_config(&config)
    }

    async fn set_autostart(&self, enable: bool) -> BackendResult<()> {
        self.record("set_autostart")?;
        let mut state = self.lock();
        let mut config = state.config();
        config.autostart = enable;
        state.store_config(&config)
    }

    async fn set_window_theme(&self, theme: &str) -> BackendResult<()> {
        self.record("set_window_theme")?;
        self.lock().theme = Some(theme.to_string());
        Ok(())
    }

    async fn sync_pull(
        &self,
        local_folder: &str,
        server: &str,
        remote_path: &str,
        _port: u16,
    ) -> BackendResult<SyncOutcome> {
        self.record("sync_pull")?;
        let delay = self.lock().sync_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        let remote: Vec<(String, String)> =
            state.remote.iter().map(|(r, c)| (r.clone(), c.clone())).collect();
        for (relative, content) in &remote {
            let local = path::join(local_folder, relative);
            state.ensure_parents(&local);
            state.files.insert(local, content.clone());
        }
        Ok(SyncOutcome::success(format!(
            "Pulled {} files from {}:{}",
            remote.len(),
            server,
            remote_path
        )))
    }

    async fn sync_push(
        &self,
        local_folder: &str,
        server: &str,
        remote_path: &str,
        _port: u16,
    ) -> BackendResult<SyncOutcome> {
        self.record("sync_push")?;
        let delay = self.lock().sync_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        let remote: BTreeMap<String, String> = state
            .files
            .iter()
            .filter_map(|(p, c)| {
                path::relative_to(local_folder, p)
                    .filter(|r| !r.is_empty())
                    .map(|r| (r, c.clone()))
            })
            .collect();
        let count = remote.len();
        state.remote = remote;
        Ok(SyncOutcome::success(format!(
            "Pushed {} files to {}:{}",
            count, server, remote_path
        )))
    }

    async fn test_ssh_connection(&self, server: &str, port: u16) -> BackendResult<String> {
        self.record("test_ssh_connection")?;
        Ok(format!("Connected to {} on port {}", server, port))
    }

    async fn check_ssh_available(&self) -> BackendResult<bool> {
        self.record("check_ssh_available")?;
        Ok(self.lock().ssh_available)
    }
}
