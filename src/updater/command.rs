use std::path::PathBuf;

use crate::scm::{ChangeEvent, HistoryEntry, ScmMount};

/// Work items consumed by the tree updater, in FIFO order.
#[derive(Debug, Clone)]
pub enum UpdateCommand {
    /// Rescan the filesystem and merge it into the tree.
    RebuildTree,
    ApplyChange(ChangeEvent),
    /// Carries the event as it was last reported, old status included.
    ClearChange(ChangeEvent),
    /// The full set of SCM roots currently known.
    ScmRootsChanged(Vec<ScmMount>),
    /// Replaces the history listed below the node at the absolute `path`.
    AttachHistory {
        path: PathBuf,
        entries: Vec<HistoryEntry>,
    },
    Shutdown,
}
