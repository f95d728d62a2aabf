//! Repository Mirror
//!
//! Client-side copy of the prompt library: config, entries, folders, the
//! derived tree, the current selection and the editor draft.

use crate::domain::path;
use crate::domain::{PromptEntry, RepositoryConfig};
use crate::tree::FolderTree;

/// Editor fields for the selected entry (or a new one in create mode)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub mnemonic: String,
}

impl Draft {
    pub fn from_entry(entry: &PromptEntry) -> Self {
        Self {
            title: entry.title.clone(),
            content: entry.content.clone(),
            mnemonic: entry.mnemonic.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mirror {
    pub config: RepositoryConfig,
    /// Entries in scan order
    pub entries: Vec<PromptEntry>,
    pub folders: Vec<String>,
    pub tree: FolderTree,
    /// File path of the entry being edited; `None` is create mode
    pub selected: Option<String>,
    pub draft: Draft,
    /// Bumped on every completed reload
    pub version: u64,
}

impl Mirror {
    pub fn new(config: RepositoryConfig) -> Self {
        Self { config, ..Default::default() }
    }

    pub fn has_root(&self) -> bool {
        self.config.has_root()
    }

    pub fn root(&self) -> &str {
        &self.config.root_folder
    }

    pub fn selected_entry(&self) -> Option<&PromptEntry> {
        self.selected.as_deref().and_then(|p| store_find_entry(self, p))
    }

    pub fn is_selected(&self, file_path: &str) -> bool {
        self.selected.as_deref().is_some_and(|s| path::same_path(s, file_path))
    }
}

// ========================
// Store Helper Functions
// ========================

/// Find an entry by file path
pub fn store_find_entry<'a>(mirror: &'a Mirror, file_path: &str) -> Option<&'a PromptEntry> {
    mirror.entries.iter().find(|e| path::same_path(&e.file_path, file_path))
}

/// Replace the library with a fresh scan and rebuild the tree
///
/// Mnemonics already fetched are carried over by path. A selection whose
/// file disappeared drops back to create mode; the draft is kept.
pub fn store_replace_scan(mirror: &mut Mirror, mut entries: Vec<PromptEntry>, folders: Vec<String>) {
    for entry in entries.iter_mut().filter(|e| e.mnemonic.is_none()) {
        entry.mnemonic = store_find_entry(mirror, &entry.file_path).and_then(|old| old.mnemonic.clone());
    }

    mirror.tree = FolderTree::build(&mirror.config.root_folder, &folders, &entries);
    mirror.entries = entries;
    mirror.folders = folders;
    mirror.version += 1;

    if let Some(selected) = mirror.selected.clone() {
        if store_find_entry(mirror, &selected).is_none() {
            mirror.selected = None;
        }
    }
}

/// Update the title and content of an entry in both the list and the tree
pub fn store_patch_entry(mirror: &mut Mirror, file_path: &str, title: &str, content: &str) -> bool {
    let Some(entry) = mirror
        .entries
        .iter_mut()
        .find(|e| path::same_path(&e.file_path, file_path))
    else {
        return false;
    };
    entry.title = title.to_string();
    entry.content = content.to_string();

    if let Some(node_entry) = mirror.tree.entry_mut(file_path) {
        node_entry.title = title.to_string();
        node_entry.content = content.to_string();
    }
    true
}

/// Record the mnemonic of an entry; an empty value clears it
pub fn store_set_mnemonic(mirror: &mut Mirror, file_path: &str, mnemonic: &str) {
    let value = (!mnemonic.is_empty()).then(|| mnemonic.to_string());
    if let Some(entry) = mirror
        .entries
        .iter_mut()
        .find(|e| path::same_path(&e.file_path, file_path))
    {
        entry.mnemonic = value.clone();
    }
    if let Some(node_entry) = mirror.tree.entry_mut(file_path) {
        node_entry.mnemonic = value;
    }
}

/// Point the editor at an entry, loading its fields into the draft
pub fn store_select(mirror: &mut Mirror, file_path: &str) -> bool {
    let Some(draft) = store_find_entry(mirror, file_path).map(Draft::from_entry) else {
        return false;
    };
    mirror.selected = Some(path::normalize(file_path));
    mirror.draft = draft;
    true
}

/// Create mode: nothing selected and an empty draft
pub fn store_clear_selection(mirror: &mut Mirror) {
    mirror.selected = None;
    mirror.draft = Draft::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_entry(file_path: &str, content: &str) -> PromptEntry {
        let category = path::parent(file_path.trim_start_matches("/p/")).unwrap_or_default();
        PromptEntry::new(file_path, path::file_stem(file_path), content, file_path, category)
    }

    fn sample_mirror() -> Mirror {
        let mut config = RepositoryConfig::default();
        config.root_folder = "/p".to_string();
        let mut mirror = Mirror::new(config);
        store_replace_scan(
            &mut mirror,
            vec![make_entry("/p/a/x.txt", "hello"), make_entry("/p/top.md", "")],
            vec!["/p/a".to_string()],
        );
        mirror
    }

    #[test]
    fn test_replace_scan_rebuilds_tree() {
        let mirror = sample_mirror();
        assert_eq!(mirror.version, 1);
        assert_eq!(mirror.tree.file_count(), 2);
        assert_eq!(mirror.tree.folder_count(), 1);
        assert!(mirror.tree.entry("/p/a/x.txt").is_some());
    }

    #[test]
    fn test_vanished_selection_keeps_draft() {
        let mut mirror = sample_mirror();
        assert!(store_select(&mut mirror, "/p/a/x.txt"));
        mirror.draft.content = "edited".to_string();

        store_replace_scan(&mut mirror, vec![make_entry("/p/top.md", "")], vec![]);
        assert_eq!(mirror.selected, None);
        assert_eq!(mirror.draft.content, "edited");
    }

    #[test]
    fn test_patch_updates_list_and_tree() {
        let mut mirror = sample_mirror();
        assert!(store_patch_entry(&mut mirror, r"\p\a\x.txt", "x", "bye"));
        assert_eq!(store_find_entry(&mirror, "/p/a/x.txt").unwrap().content, "bye");
        assert_eq!(mirror.tree.entry("/p/a/x.txt").unwrap().content, "bye");
        assert!(!store_patch_entry(&mut mirror, "/p/missing.md", "m", ""));
    }

    #[test]
    fn test_mnemonics_survive_rescan() {
        let mut mirror = sample_mirror();
        store_set_mnemonic(&mut mirror, "/p/a/x.txt", "hx");

        let rescanned = vec![make_entry("/p/a/x.txt", "hello"), make_entry("/p/top.md", "")];
        store_replace_scan(&mut mirror, rescanned, vec!["/p/a".to_string()]);
        assert_eq!(
            store_find_entry(&mirror, "/p/a/x.txt").unwrap().mnemonic.as_deref(),
            Some("hx")
        );
        assert_eq!(mirror.tree.entry("/p/a/x.txt").unwrap().mnemonic.as_deref(), Some("hx"));
    }

    #[test]
    fn test_select_and_clear() {
        let mut mirror = sample_mirror();
        assert!(!store_select(&mut mirror, "/p/nope.md"));
        assert!(store_select(&mut mirror, "/p/a/x.txt"));
        assert_eq!(mirror.draft.content, "hello");
        assert!(mirror.is_selected(r"\p\a\x.txt"));

        store_clear_selection(&mut mirror);
        assert_eq!(mirror.selected, None);
        assert_eq!(mirror.draft, Draft::default());
    }
}
