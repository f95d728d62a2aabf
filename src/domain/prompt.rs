//! Prompt Entity
//!
//! A titled unit of reusable text stored as one file.

use serde::{Deserialize, Serialize};

/// Category of entries that live directly in the root folder
pub const ROOT_CATEGORY: &str = "";

/// A prompt entry as scanned from the library
///
/// `file_path` is the addressing key. `id` is whatever the backend hands out
/// and is never used to match entries across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub id: String,
    /// Display name, also the filename stem on save
    pub title: String,
    pub content: String,
    /// Absolute path of the backing file
    pub file_path: String,
    /// Folder path relative to the root ("" for the root itself)
    pub category: String,
    /// Loaded lazily, when the entry is selected
    #[serde(default)]
    pub mnemonic: Option<String>,
}

impl PromptEntry {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        file_path: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            file_path: file_path.into(),
            category: category.into(),
            mnemonic: None,
        }
    }
}

/// Read-only snapshot used by quick insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnemonicRecord {
    /// Empty when the entry has no mnemonic
    pub mnemonic: String,
    pub title: String,
    pub content: String,
}

impl MnemonicRecord {
    pub fn new(
        mnemonic: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Case-insensitive substring match on mnemonic, title or content
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.mnemonic.to_lowercase().contains(needle)
            || self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
    }
}
