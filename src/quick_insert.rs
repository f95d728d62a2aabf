//! Quick Insert
//!
//! Popup search over every prompt's mnemonic, title and content. Committing
//! hides the popup, waits for focus to return to the previous application,
//! then inserts the full original content there.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::domain::{BackendContext, CoreError, CoreResult, MnemonicRecord, Refusal};
use crate::options::SessionOptions;

/// How text reaches the target application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Clipboard paste in one go
    #[default]
    Paste,
    /// Typed key by key, for targets that block paste
    Keystrokes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickKey {
    Up,
    Down,
    Enter,
    Escape,
}

/// What a key press did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Moved(usize),
    Inserted,
    Dismissed,
    Ignored,
}

/// One display row; every text field is already escaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickRow {
    /// Position in the filtered list
    pub index: usize,
    pub mnemonic: String,
    pub title: String,
    pub preview: String,
    pub selected: bool,
}

/// Escape text for markup (`& < > " '`)
pub fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// First `limit` characters, with an ellipsis only when something was cut
pub fn preview(content: &str, limit: usize) -> String {
    let mut chars = content.chars();
    let mut shown: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        shown.push_str("...");
    }
    shown
}

pub struct QuickInsert<B: Backend> {
    backend: Arc<B>,
    /// Full records as loaded; never escaped
    records: Vec<MnemonicRecord>,
    query: String,
    /// Indices into `records`, in load order
    filtered: Vec<usize>,
    selected: Option<usize>,
    mode: InsertMode,
    settle_delay: Duration,
    preview_chars: usize,
}

impl<B: Backend> QuickInsert<B> {
    pub fn new(backend: Arc<B>, options: &SessionOptions) -> Self {
        Self {
            backend,
            records: Vec::new(),
            query: String::new(),
            filtered: Vec::new(),
            selected: None,
            mode: InsertMode::default(),
            settle_delay: options.settle_delay(),
            preview_chars: options.preview_chars,
        }
    }

    // ========================
    // Loading
    // ========================

    /// Popup shown
    pub async fn activate(&mut self) -> CoreResult<()> {
        self.load().await
    }

    /// Popup regained focus; entries may have changed while it was hidden
    pub async fn on_focus(&mut self) -> CoreResult<()> {
        self.load().await
    }

    async fn load(&mut self) -> CoreResult<()> {
        self.query.clear();
        match self.backend.get_all_mnemonics().await.during("Load mnemonics") {
            Ok(records) => {
                debug!(count = records.len(), "quick insert loaded");
                self.records = records;
                self.refilter();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to load quick insert entries");
                self.records.clear();
                self.refilter();
                Err(e)
            }
        }
    }

    // ========================
    // Filtering and selection
    // ========================

    pub fn query(&self) -> &str {
        &self.query
    }

    /// New filter text; the selection goes back to the first match
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.refilter();
    }

    fn refilter(&mut self) {
        let needle = self.query.to_lowercase();
        self.filtered = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.matches(&needle))
            .map(|(i, _)| i)
            .collect();
        self.selected = if self.filtered.is_empty() { None } else { Some(0) };
    }

    pub fn filtered(&self) -> Vec<&MnemonicRecord> {
        self.filtered.iter().map(|&i| &self.records[i]).collect()
    }

    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&MnemonicRecord> {
        self.selected
            .and_then(|i| self.filtered.get(i))
            .map(|&i| &self.records[i])
    }

    pub fn move_down(&mut self) -> Option<usize> {
        if let Some(sel) = self.selected {
            if sel + 1 < self.filtered.len() {
                self.selected = Some(sel + 1);
            }
        }
        self.selected
    }

    pub fn move_up(&mut self) -> Option<usize> {
        if let Some(sel) = self.selected {
            if sel > 0 {
                self.selected = Some(sel - 1);
            }
        }
        self.selected
    }

    pub fn rows(&self) -> Vec<QuickRow> {
        self.filtered
            .iter()
            .enumerate()
            .map(|(index, &i)| {
                let record = &self.records[i];
                QuickRow {
                    index,
                    mnemonic: escape_markup(&record.mnemonic),
                    title: escape_markup(&record.title),
                    preview: escape_markup(&preview(&record.content, self.preview_chars)),
                    selected: self.selected == Some(index),
                }
            })
            .collect()
    }

    pub fn mode(&self) -> InsertMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InsertMode) {
        self.mode = mode;
    }

    // ========================
    // Keyboard and commit
    // ========================

    pub async fn handle_key(&mut self, key: QuickKey) -> CoreResult<KeyOutcome> {
        match key {
            QuickKey::Down => Ok(self.move_down().map_or(KeyOutcome::Ignored, KeyOutcome::Moved)),
            QuickKey::Up => Ok(self.move_up().map_or(KeyOutcome::Ignored, KeyOutcome::Moved)),
            QuickKey::Enter => self.commit().await.map(|_| KeyOutcome::Inserted),
            QuickKey::Escape => self.dismiss().await.map(|_| KeyOutcome::Dismissed),
        }
    }

    /// Insert the selected entry's content
    pub async fn commit(&self) -> CoreResult<()> {
        let content = self
            .selected_record()
            .map(|r| r.content.clone())
            .ok_or(Refusal::NothingSelected)?;
        self.insert(content, self.mode).await
    }

    /// Row clicked
    pub async fn commit_row(&mut self, index: usize) -> CoreResult<()> {
        if index >= self.filtered.len() {
            return Err(Refusal::NothingSelected.into());
        }
        self.selected = Some(index);
        self.commit().await
    }

    /// Type out whatever is on the clipboard
    pub async fn paste_clipboard(&self) -> CoreResult<()> {
        let text = self.backend.read_clipboard().await.during("Read clipboard")?;
        if text.is_empty() {
            return Err(Refusal::NothingToCopy.into());
        }
        self.insert(text, InsertMode::Keystrokes).await
    }

    pub async fn dismiss(&self) -> CoreResult<()> {
        self.backend.hide_popup().await.during("Hide")
    }

    pub async fn on_blur(&self) -> CoreResult<()> {
        self.dismiss().await
    }

    /// Hide, settle, insert; runs to completion even if the caller goes away
    async fn insert(&self, text: String, mode: InsertMode) -> CoreResult<()> {
        let backend = self.backend.clone();
        let settle = self.settle_delay;
        tokio::spawn(async move {
            backend.hide_popup().await.during("Hide")?;
            tokio::time::sleep(settle).await;
            match mode {
                InsertMode::Paste => backend.type_text(&text).await,
                InsertMode::Keystrokes => backend.type_text_simulate(&text).await,
            }
            .during("Insert")
        })
        .await
        .map_err(|e| CoreError::backend("Insert", e.to_string()))?
    }
}
