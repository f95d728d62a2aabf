//! Expand State
//!
//! Which folders are open in the sidebar. Lives for the session, outside
//! the tree, so rebuilding the tree never collapses anything.

use std::collections::HashSet;

use crate::domain::path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    open: HashSet<String>,
}

impl ExpandState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `folder` and return whether it is now open
    pub fn toggle(&mut self, folder: &str) -> bool {
        let key = path::normalize(folder);
        if self.open.remove(&key) {
            false
        } else {
            self.open.insert(key);
            true
        }
    }

    pub fn is_expanded(&self, folder: &str) -> bool {
        self.open.contains(&path::normalize(folder))
    }

    pub fn expand(&mut self, folder: &str) {
        self.open.insert(path::normalize(folder));
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Carry open folders at or below `old` over to `new`
    pub fn rename_prefix(&mut self, old: &str, new: &str) {
        self.open = self
            .open
            .drain()
            .map(|p| path::rebase(&p, old, new).unwrap_or(p))
            .collect();
    }

    /// Drop `folder` and everything below it
    pub fn forget_under(&mut self, folder: &str) {
        self.open.retain(|p| !path::is_within(p, folder));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_membership() {
        let mut state = ExpandState::new();
        assert!(state.toggle("/p/a"));
        assert!(state.is_expanded(r"\p\a"));
        assert!(!state.toggle("/p/a/"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_rename_prefix_keeps_nested_state() {
        let mut state = ExpandState::new();
        state.expand("/p/a");
        state.expand("/p/a/b");
        state.expand("/p/ab");

        state.rename_prefix("/p/a", "/p/z");
        assert!(state.is_expanded("/p/z"));
        assert!(state.is_expanded("/p/z/b"));
        assert!(state.is_expanded("/p/ab"));
        assert!(!state.is_expanded("/p/a"));
    }

    #[test]
    fn test_forget_under() {
        let mut state = ExpandState::new();
        state.expand("/p/a");
        state.expand("/p/a/b");
        state.expand("/p/c");

        state.forget_under("/p/a");
        assert_eq!(state.len(), 1);
        assert!(state.is_expanded("/p/c"));
    }
}
