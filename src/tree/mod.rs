//! Tree Utilities
//!
//! Folder hierarchy derived from a scan, the session's expand state, and
//! the flattened rows the sidebar renders.

mod builder;
mod expand;
mod rows;

pub use builder::{FolderNode, FolderTree, NodeId};
pub use expand::ExpandState;
pub use rows::{visible_rows, TreeRow};
