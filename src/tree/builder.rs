//! Folder Tree Builder
//!
//! Turns the flat folder list and entry list of one scan into an indexed
//! tree. The tree is rebuilt from scratch on every reload; only entry fields
//! are ever patched in place.

use std::collections::{BTreeMap, HashMap};

use crate::domain::path;
use crate::domain::PromptEntry;

pub type NodeId = usize;

const ROOT_ID: NodeId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    /// Normalized absolute path, the node's key
    pub path: String,
    pub name: String,
    /// Child folders by name; iteration is lexicographic
    pub children: BTreeMap<String, NodeId>,
    /// Entries in scan order
    pub files: Vec<PromptEntry>,
}

impl FolderNode {
    fn new(path: String) -> Self {
        let name = path::file_name(&path);
        Self { path, name, children: BTreeMap::new(), files: Vec::new() }
    }
}

/// Arena of folder nodes with O(1) lookup by path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTree {
    nodes: Vec<FolderNode>,
    by_path: HashMap<String, NodeId>,
}

impl Default for FolderTree {
    fn default() -> Self {
        Self::empty("")
    }
}

impl FolderTree {
    /// Tree holding only the root
    pub fn empty(root: &str) -> Self {
        let root = path::normalize(root);
        let mut by_path = HashMap::new();
        by_path.insert(root.clone(), ROOT_ID);
        Self { nodes: vec![FolderNode::new(root)], by_path }
    }

    /// Build the tree for one scan of `root`
    ///
    /// `folders` is the source of truth for empty folders, `entries` for
    /// files. Inserting the same folder twice is a no-op.
    pub fn build(root: &str, folders: &[String], entries: &[PromptEntry]) -> Self {
        let mut tree = Self::empty(root);
        let root = tree.nodes[ROOT_ID].path.clone();

        for folder in folders {
            let relative = tree_relative(&root, folder);
            if relative.is_empty() {
                continue;
            }
            tree.walk(&relative);
        }

        for entry in entries {
            let relative = tree_relative(&root, &entry.file_path);
            let folder = path::parent(&relative).unwrap_or_default();
            let id = tree.walk(&folder);
            tree.nodes[id].files.push(entry.clone());
        }

        tree
    }

    /// Walk from the root along `relative`, creating missing nodes
    fn walk(&mut self, relative: &str) -> NodeId {
        let mut current = ROOT_ID;
        for segment in path::segments(relative) {
            current = match self.nodes[current].children.get(segment) {
                Some(&id) => id,
                None => {
                    let child_path = path::join(&self.nodes[current].path, segment);
                    let id = self.nodes.len();
                    self.nodes.push(FolderNode::new(child_path.clone()));
                    self.by_path.insert(child_path, id);
                    self.nodes[current].children.insert(segment.to_string(), id);
                    id
                }
            };
        }
        current
    }

    pub fn root(&self) -> &FolderNode {
        &self.nodes[ROOT_ID]
    }

    /// Folder node by absolute path, either separator style
    pub fn get(&self, folder: &str) -> Option<&FolderNode> {
        self.by_path.get(&path::normalize(folder)).map(|&id| &self.nodes[id])
    }

    /// Child folders of `node` in name order
    pub fn children<'a>(&'a self, node: &'a FolderNode) -> impl Iterator<Item = &'a FolderNode> + 'a {
        node.children.values().map(move |&id| &self.nodes[id])
    }

    /// Every folder path except the root
    pub fn folder_paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().skip(1).map(|n| n.path.as_str())
    }

    pub fn folder_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn file_count(&self) -> usize {
        self.nodes.iter().map(|n| n.files.len()).sum()
    }

    /// No folders and no files
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[ROOT_ID].files.is_empty()
    }

    pub fn entry(&self, file_path: &str) -> Option<&PromptEntry> {
        let node = self.get(&path::parent(file_path)?)?;
        node.files.iter().find(|e| path::same_path(&e.file_path, file_path))
    }

    pub fn entry_mut(&mut self, file_path: &str) -> Option<&mut PromptEntry> {
        let id = *self.by_path.get(&path::parent(file_path)?)?;
        self.nodes[id]
            .files
            .iter_mut()
            .find(|e| path::same_path(&e.file_path, file_path))
    }
}

/// Path relative to the root; paths outside it are taken as-is
fn tree_relative(root: &str, target: &str) -> String {
    path::relative_to(root, target)
        .unwrap_or_else(|| path::normalize(target).trim_start_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn entry(file_path: &str) -> PromptEntry {
        PromptEntry::new(file_path, path::file_stem(file_path), "", file_path, "")
    }

    #[test]
    fn test_single_folder_single_file() {
        let tree = FolderTree::build("/p", &["/p/a".to_string()], &[entry("/p/a/x.txt")]);

        let root = tree.root();
        assert!(root.files.is_empty());
        assert_eq!(root.children.keys().collect::<Vec<_>>(), vec!["a"]);

        let a = tree.get("/p/a").unwrap();
        assert!(a.children.is_empty());
        assert_eq!(a.files.len(), 1);
        assert_eq!(a.files[0].title, "x");
    }

    #[test]
    fn test_shared_prefix_reuses_ancestor() {
        let folders = vec![
            "/p/a".to_string(),
            "/p/a/b".to_string(),
            "/p/a".to_string(),
            r"\p\a\c".to_string(),
        ];
        let tree = FolderTree::build("/p", &folders, &[]);

        assert_eq!(tree.folder_count(), 3);
        let a = tree.get("/p/a").unwrap();
        let names: Vec<&str> = tree.children(a).map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_root_itself_is_ignored() {
        let tree = FolderTree::build("/p", &["/p".to_string(), "/p/".to_string()], &[]);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_children_are_lexicographic_files_in_scan_order() {
        let folders = vec!["/p/zeta".to_string(), "/p/alpha".to_string()];
        let entries = vec![entry("/p/b.md"), entry("/p/a.md")];
        let tree = FolderTree::build("/p", &folders, &entries);

        let names: Vec<&str> = tree.children(tree.root()).map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        let titles: Vec<&str> = tree.root().files.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[test]
    fn test_entry_lookup_and_patch() {
        let mut tree = FolderTree::build("/p", &[], &[entry("/p/a/x.md")]);

        assert!(tree.entry(r"/p\a\x.md").is_some());
        tree.entry_mut("/p/a/x.md").unwrap().content = "patched".into();
        assert_eq!(tree.entry("/p/a/x.md").unwrap().content, "patched");
        assert!(tree.entry("/p/a/missing.md").is_none());
    }

    #[test]
    fn test_windows_root() {
        let tree = FolderTree::build(
            r"C:\prompts",
            &[r"C:\prompts\work".to_string()],
            &[entry(r"C:\prompts\work\mail.md")],
        );
        assert_eq!(tree.get("C:/prompts/work").unwrap().files.len(), 1);
    }

    fn relative_paths() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::collection::vec("[a-c]{1,2}", 1..4), 0..8)
            .prop_map(|paths| paths.into_iter().map(|segs| segs.join("/")).collect())
    }

    proptest! {
        #[test]
        fn prop_leaves_and_folders_match_input(folders in relative_paths(), files in relative_paths()) {
            let folder_paths: Vec<String> = folders.iter().map(|r| format!("/p/{}", r)).collect();
            // Distinct file paths; a numeric stem cannot collide with a folder name
            let entries: Vec<PromptEntry> = files
                .iter()
                .enumerate()
                .map(|(i, r)| entry(&format!("/p/{}/{}.md", r, i)))
                .collect();

            let tree = FolderTree::build("/p", &folder_paths, &entries);
            prop_assert_eq!(tree.file_count(), entries.len());

            let mut expected: BTreeSet<String> = BTreeSet::new();
            for p in folder_paths.iter().chain(entries.iter().map(|e| &e.file_path)) {
                let rel = path::relative_to("/p", p).unwrap();
                let segs: Vec<&str> = path::segments(&rel).collect();
                let is_file = p.ends_with(".md");
                let depth = if is_file { segs.len() - 1 } else { segs.len() };
                for i in 1..=depth {
                    expected.insert(format!("/p/{}", segs[..i].join("/")));
                }
            }
            let actual: BTreeSet<String> = tree.folder_paths().map(str::to_string).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_build_is_idempotent(folders in relative_paths(), files in relative_paths()) {
            let folder_paths: Vec<String> = folders.iter().map(|r| format!("/p/{}", r)).collect();
            let entries: Vec<PromptEntry> =
                files.iter().map(|r| entry(&format!("/p/{}.md", r))).collect();

            let first = FolderTree::build("/p", &folder_paths, &entries);
            let second = FolderTree::build("/p", &folder_paths, &entries);
            prop_assert_eq!(first, second);
        }
    }
}
