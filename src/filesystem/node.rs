use derive_more::{Display, From};
use hashlink::LinkedHashMap;

use crate::scm::{HistoryEntry, ScmKind, ScmMount, ScmStatus};

/// Index of a node inside a [`SourceTree`](super::SourceTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("#{_0}")]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a filesystem entry is, as seen by a scan or an SCM report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
    /// One revision listed below the node whose history was requested.
    History(HistoryEntry),
}

impl From<EntryKind> for NodeKind {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Directory => NodeKind::Directory,
            EntryKind::File => NodeKind::File,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(super) name: String,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) kind: NodeKind,
    pub(super) open: bool,
    pub(super) states: LinkedHashMap<ScmKind, ScmStatus>,
    pub(super) flag: Option<ScmStatus>,
    pub(super) display_line: Option<usize>,
    pub(super) on_disk: bool,
    pub(super) mount: Option<ScmMount>,
}

impl TreeNode {
    pub(super) fn new(name: impl Into<String>, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            kind,
            open: false,
            states: LinkedHashMap::new(),
            flag: None,
            display_line: None,
            on_disk: false,
            mount: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    pub fn history(&self) -> Option<&HistoryEntry> {
        match &self.kind {
            NodeKind::History(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Per engine statuses reported for this exact path, in arrival order.
    pub fn states(&self) -> &LinkedHashMap<ScmKind, ScmStatus> {
        &self.states
    }

    /// Aggregate of the statuses found below this node.
    pub fn flag(&self) -> Option<ScmStatus> {
        self.flag
    }

    /// 1-based line assigned by the last render, `None` when not shown.
    pub fn display_line(&self) -> Option<usize> {
        self.display_line
    }

    pub fn on_disk(&self) -> bool {
        self.on_disk
    }

    pub fn mount(&self) -> Option<&ScmMount> {
        self.mount.as_ref()
    }

    /// Nodes that only exist as scaffolding for something below them.
    pub(super) fn is_disposable(&self) -> bool {
        !self.on_disk
            && self.children.is_empty()
            && self.states.is_empty()
            && self.mount.is_none()
            && !matches!(self.kind, NodeKind::History(_))
    }
}
