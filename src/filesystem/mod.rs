//! In-memory tree of the project directory.
//!
//! The tree is an arena of [`TreeNode`]s addressed by [`NodeId`]. Nodes carry
//! the SCM statuses reported for their path and an aggregated flag for what
//! lies below them. [`FilesystemScan`] takes a snapshot of the directory on
//! disk that [`SourceTree::merge_scan`] folds into the tree.

mod filter;
mod node;
mod scan;
mod tree;

pub use filter::IgnoreFilter;
pub use node::{EntryKind, NodeId, NodeKind, TreeNode};
pub use scan::{FilesystemScan, ScanEntry};
pub use tree::{MergeSummary, SourceTree, TreeError};
