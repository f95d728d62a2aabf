//! Autosave Controller
//!
//! Debounced persistence of the editor draft. Every edit bumps a
//! generation counter and re-arms a single timer; when the timer fires the
//! save runs as its own task so nothing can cancel it mid-call. Saves take
//! the session's sequence guard, so a save started while another is in
//! flight waits for it and then sees the path the first one produced.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::domain::path;
use crate::domain::{BackendContext, CoreError, CoreResult, Refusal, ROOT_CATEGORY};
use crate::session::{SequenceGuard, Session};
use crate::store::{store_patch_entry, store_set_mnemonic};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveState {
    Idle,
    /// Edited since the last save
    Dirty,
    Saving,
    /// Last save failed; the draft is untouched
    Error(String),
}

/// Who asked for the save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Timer or flush; failures only reach the log and the state
    Silent,
    /// Save button; outcome is always reported
    Explicit,
}

#[derive(Debug)]
pub struct AutosaveController {
    state: AutosaveState,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl Default for AutosaveController {
    fn default() -> Self {
        Self::new()
    }
}

impl AutosaveController {
    pub fn new() -> Self {
        Self { state: AutosaveState::Idle, generation: 0, timer: None }
    }

    pub fn state(&self) -> &AutosaveState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Record an edit; the previous timer is cancelled
    pub fn mark_dirty(&mut self) -> u64 {
        self.cancel_timer();
        self.generation += 1;
        self.state = AutosaveState::Dirty;
        self.generation
    }

    pub fn arm(&mut self, timer: JoinHandle<()>) {
        self.cancel_timer();
        self.timer = Some(timer);
    }

    pub fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    /// Called by the timer itself; false when a newer edit superseded it
    pub fn fire(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.timer = None;
        true
    }

    /// Claim the pending edit for an immediate save
    ///
    /// Returns the generation to save under, or `None` when nothing is
    /// pending. Saves queued for earlier generations become stale.
    pub fn take_pending(&mut self) -> Option<u64> {
        if self.state != AutosaveState::Dirty {
            return None;
        }
        self.cancel_timer();
        self.generation += 1;
        Some(self.generation)
    }

    /// Throw the pending edit away (its entry is gone)
    pub fn discard_pending(&mut self) {
        self.cancel_timer();
        self.generation += 1;
        self.state = AutosaveState::Idle;
    }

    /// Start over for a newly selected entry
    pub fn reset(&mut self) {
        self.discard_pending();
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Snapshot taken; returns the generation the snapshot belongs to
    pub fn begin_save(&mut self) -> u64 {
        self.state = AutosaveState::Saving;
        self.generation
    }

    /// A save finished; stale completions leave the state alone
    pub fn finish_save(&mut self, generation: u64, outcome: Result<(), String>) {
        if generation != self.generation {
            return;
        }
        self.state = match outcome {
            Ok(()) => AutosaveState::Idle,
            Err(message) => AutosaveState::Error(message),
        };
    }
}

struct SaveSnapshot {
    root: String,
    category: String,
    title: String,
    content: String,
    mnemonic: String,
    original_path: Option<String>,
}

impl<B: Backend> Session<B> {
    // ========================
    // Editing
    // ========================

    pub async fn edit_title(&self, title: &str) {
        self.mirror.lock().await.draft.title = title.to_string();
        self.schedule_autosave().await;
    }

    pub async fn edit_content(&self, content: &str) {
        self.mirror.lock().await.draft.content = content.to_string();
        self.schedule_autosave().await;
    }

    /// Re-arm the timer; create mode never autosaves
    async fn schedule_autosave(&self) {
        if self.mirror.lock().await.selected.is_none() {
            return;
        }

        let mut controller = self.autosave_lock();
        let generation = controller.mark_dirty();
        let session = self.me.clone();
        let delay = self.options.autosave_delay();
        controller.arm(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = session.upgrade() {
                session.fire_autosave(generation);
            }
        }));
    }

    fn fire_autosave(self: Arc<Self>, generation: u64) {
        if !self.autosave_lock().fire(generation) {
            return;
        }
        debug!(generation, "autosave timer fired");
        tokio::spawn(async move {
            let _ = self.run_save(SaveMode::Silent, Some(generation)).await;
        });
    }

    // ========================
    // Saving
    // ========================

    /// Save the draft now and report the outcome
    ///
    /// In create mode this creates the entry and selects it. Returns the
    /// path the entry ended up at.
    pub async fn save(&self) -> CoreResult<String> {
        self.autosave_lock().cancel_timer();
        self.detached_save(SaveMode::Explicit, None)
            .await
            .unwrap_or_else(|| Err(CoreError::backend("Save", "superseded by a newer edit")))
    }

    /// Save a pending edit before the editor moves elsewhere
    pub(crate) async fn flush_pending(&self) {
        let pending = self.autosave_lock().take_pending();
        if let Some(generation) = pending {
            debug!(generation, "flushing pending edit");
            let _ = self.detached_save(SaveMode::Silent, Some(generation)).await;
        }
    }

    /// Run the save on its own task so dropping the caller cannot cut it short
    async fn detached_save(&self, mode: SaveMode, expected: Option<u64>) -> Option<CoreResult<String>> {
        match self.me.upgrade() {
            Some(session) => {
                match tokio::spawn(async move { session.run_save(mode, expected).await }).await {
                    Ok(outcome) => outcome,
                    Err(e) => Some(Err(CoreError::backend("Save", e.to_string()))),
                }
            }
            None => self.run_save(mode, expected).await,
        }
    }

    /// `None` when `expected` is no longer the current generation
    async fn run_save(&self, mode: SaveMode, expected: Option<u64>) -> Option<CoreResult<String>> {
        let seq = self.sequence().await;

        if let Some(expected) = expected {
            let current = self.autosave_lock().is_current(expected);
            if !current {
                debug!(expected, "skipping superseded autosave");
                return None;
            }
        }

        let snapshot = {
            let mirror = self.mirror.lock().await;
            let category = mirror
                .selected_entry()
                .map(|e| e.category.clone())
                .unwrap_or_else(|| ROOT_CATEGORY.to_string());
            SaveSnapshot {
                root: mirror.root().to_string(),
                category,
                title: mirror.draft.title.trim().to_string(),
                content: mirror.draft.content.clone(),
                mnemonic: mirror.draft.mnemonic.trim().to_lowercase(),
                original_path: mirror.selected.clone(),
            }
        };
        let generation = self.autosave_lock().begin_save();

        let result = async {
            if snapshot.root.trim().is_empty() {
                return Err(CoreError::from(Refusal::NoRootFolder));
            }
            if snapshot.title.is_empty() {
                return Err(CoreError::from(Refusal::EmptyTitle));
            }
            self.backend
                .save_prompt(
                    &snapshot.root,
                    &snapshot.category,
                    &snapshot.title,
                    &snapshot.content,
                    snapshot.original_path.as_deref(),
                )
                .await
                .during("Save")
        }
        .await;

        let result = match result {
            Ok(saved) => self.apply_saved(&seq, &snapshot, saved).await,
            Err(e) => Err(e),
        };
        drop(seq);

        self.autosave_lock()
            .finish_save(generation, result.as_ref().map(|_| ()).map_err(ToString::to_string));
        Some(match mode {
            SaveMode::Explicit => self.report(result, Some("Saved")),
            SaveMode::Silent => {
                match &result {
                    Ok(saved) => debug!(file = %saved, "autosaved"),
                    Err(e) => warn!(error = %e, "autosave failed"),
                }
                result
            }
        })
    }

    /// Bring the mirror in line with what the save produced
    async fn apply_saved(
        &self,
        seq: &SequenceGuard<'_>,
        snapshot: &SaveSnapshot,
        saved: String,
    ) -> CoreResult<String> {
        let moved = snapshot
            .original_path
            .as_deref()
            .map_or(true, |original| !path::same_path(original, &saved));

        if !moved {
            let mut mirror = self.mirror.lock().await;
            store_patch_entry(&mut mirror, &saved, &snapshot.title, &snapshot.content);
            return Ok(saved);
        }

        if let Some(original) = snapshot.original_path.as_deref() {
            if !snapshot.mnemonic.is_empty() {
                if let Err(e) = self.move_mnemonic(original, &saved, &snapshot.mnemonic).await {
                    warn!(from = %original, to = %saved, error = %e, "failed to move mnemonic");
                }
            }
        }

        // Re-point the selection before the reload drops the old path; leave
        // it alone if the user moved on meanwhile
        let still_here = {
            let mut mirror = self.mirror.lock().await;
            let still_here = mirror.selected == snapshot.original_path;
            if still_here {
                mirror.selected = Some(path::normalize(&saved));
            }
            still_here
        };

        self.refresh(seq).await?;

        let mut mirror = self.mirror.lock().await;
        // The reload clears the selection if the new path is missing from the scan
        if still_here && mirror.is_selected(&saved) && !snapshot.mnemonic.is_empty() {
            store_set_mnemonic(&mut mirror, &saved, &snapshot.mnemonic);
        }
        Ok(saved)
    }

    async fn move_mnemonic(&self, from: &str, to: &str, mnemonic: &str) -> Result<(), String> {
        self.backend.remove_mnemonic(from).await?;
        self.backend.set_mnemonic(to, mnemonic).await
    }
}
