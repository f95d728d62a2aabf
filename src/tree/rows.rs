//! Tree Rows
//!
//! Flattens the folder tree into sidebar rows in display order.

use crate::domain::path;

use super::builder::{FolderNode, FolderTree};
use super::expand::ExpandState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeRow {
    Folder {
        depth: usize,
        path: String,
        name: String,
        expanded: bool,
    },
    Entry {
        depth: usize,
        path: String,
        title: String,
        active: bool,
    },
}

impl TreeRow {
    pub fn depth(&self) -> usize {
        match self {
            TreeRow::Folder { depth, .. } | TreeRow::Entry { depth, .. } => *depth,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TreeRow::Folder { path, .. } | TreeRow::Entry { path, .. } => path,
        }
    }
}

/// Rows using recursive DFS: sub-folders by name first, then files in scan
/// order. Collapsed folders hide their contents.
pub fn visible_rows(tree: &FolderTree, expand: &ExpandState, selected: Option<&str>) -> Vec<TreeRow> {
    fn collect(
        tree: &FolderTree,
        node: &FolderNode,
        depth: usize,
        expand: &ExpandState,
        selected: Option<&str>,
        result: &mut Vec<TreeRow>,
    ) {
        for child in tree.children(node) {
            let expanded = expand.is_expanded(&child.path);
            result.push(TreeRow::Folder {
                depth,
                path: child.path.clone(),
                name: child.name.clone(),
                expanded,
            });
            if expanded {
                collect(tree, child, depth + 1, expand, selected, result);
            }
        }

        for entry in &node.files {
            result.push(TreeRow::Entry {
                depth,
                path: entry.file_path.clone(),
                title: entry.title.clone(),
                active: selected.is_some_and(|s| path::same_path(s, &entry.file_path)),
            });
        }
    }

    let mut result = Vec::new();
    collect(tree, tree.root(), 0, expand, selected, &mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PromptEntry;
    use pretty_assertions::assert_eq;

    fn make_entry(file_path: &str) -> PromptEntry {
        PromptEntry::new(file_path, path::file_stem(file_path), "", file_path, "")
    }

    fn sample_tree() -> FolderTree {
        FolderTree::build(
            "/p",
            &["/p/a".to_string(), "/p/a/b".to_string(), "/p/empty".to_string()],
            &[make_entry("/p/a/x.md"), make_entry("/p/a/b/y.md"), make_entry("/p/top.md")],
        )
    }

    #[test]
    fn test_collapsed_tree_shows_top_level_only() {
        let rows = visible_rows(&sample_tree(), &ExpandState::new(), None);
        let paths: Vec<&str> = rows.iter().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["/p/a", "/p/empty", "/p/top.md"]);
    }

    #[test]
    fn test_expanded_folders_nest_with_depth() {
        let mut expand = ExpandState::new();
        expand.expand("/p/a");
        expand.expand("/p/a/b");

        let rows = visible_rows(&sample_tree(), &expand, Some("/p/a/x.md"));
        let shape: Vec<(usize, &str)> = rows.iter().map(|r| (r.depth(), r.path())).collect();
        assert_eq!(
            shape,
            vec![
                (0, "/p/a"),
                (1, "/p/a/b"),
                (2, "/p/a/b/y.md"),
                (1, "/p/a/x.md"),
                (0, "/p/empty"),
                (0, "/p/top.md"),
            ]
        );
        assert!(matches!(&rows[3], TreeRow::Entry { active: true, .. }));
        assert!(matches!(&rows[2], TreeRow::Entry { active: false, .. }));
    }

    #[test]
    fn test_rebuild_keeps_expanded_flag() {
        let mut expand = ExpandState::new();
        expand.toggle("/p/a");

        let before = visible_rows(&sample_tree(), &expand, None);
        let after = visible_rows(&sample_tree(), &expand, None);
        assert_eq!(before, after);
        assert!(matches!(&after[0], TreeRow::Folder { expanded: true, .. }));
    }
}
