use std::path::{Path, PathBuf};

use snafu::{OptionExt, Snafu};
use tracing::debug;

use crate::ext::PathDisplayExt;
use crate::filesystem::{EntryKind, FilesystemScan, IgnoreFilter, NodeId, NodeKind, TreeNode};
use crate::scm::{HistoryEntry, ScmKind, ScmMount, ScmStatus};

/// Counts reported by [`SourceTree::merge_scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub removed: usize,
}

/// Arena backed tree of the project, rooted at an absolute directory.
///
/// Nodes own their children through ids; the parent link is a plain id used
/// for upward walks. Freed slots are recycled, so a [`NodeId`] is only valid
/// until the node it names is deleted.
#[derive(Debug, Clone)]
pub struct SourceTree {
    nodes: Vec<Option<TreeNode>>,
    free: Vec<NodeId>,
    root: NodeId,
    root_path: PathBuf,
    filter: IgnoreFilter,
}

impl SourceTree {
    pub fn new(root_path: impl Into<PathBuf>, filter: IgnoreFilter) -> Self {
        let root_path = root_path.into();
        let mut root = TreeNode::new(root_path.to_string_lossy(), None, NodeKind::Directory);
        root.open = true;
        root.on_disk = true;

        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            root: NodeId::from(0),
            root_path,
            filter,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn filter(&self) -> &IgnoreFilter {
        &self.filter
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| NodeId::from(index))
    }

    /// Every node below `id` in pre-order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut pending: Vec<NodeId> = match self.node(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return found,
        };
        while let Some(current) = pending.pop() {
            if let Some(node) = self.node(current) {
                found.push(current);
                pending.extend(node.children.iter().rev().copied());
            }
        }
        found
    }

    fn alloc(&mut self, node: TreeNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                if let Some(slot) = self.nodes.get_mut(id.index()) {
                    *slot = Some(node);
                }
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId::from(self.nodes.len() - 1)
            }
        }
    }

    /// Adds `child` to the children of `parent`: by name among files and
    /// directories, at the end for history entries.
    fn link_child(&mut self, parent: NodeId, child: NodeId) {
        let Some(child_node) = self.node(child) else {
            return;
        };
        let appended = child_node.history().is_some();
        let name = child_node.name.as_str();

        let position = self.node(parent).map(|parent_node| {
            if appended {
                return parent_node.children.len();
            }
            parent_node
                .children
                .iter()
                .position(|sibling| {
                    self.node(*sibling).is_none_or(|sibling| {
                        sibling.history().is_some() || sibling.name.as_str() > name
                    })
                })
                .unwrap_or(parent_node.children.len())
        });

        if let (Some(position), Some(parent_node)) = (position, self.node_mut(parent)) {
            parent_node.children.insert(position, child);
        }
    }

    fn attach_child(&mut self, parent: NodeId, node: TreeNode) -> NodeId {
        let id = self.alloc(node);
        self.link_child(parent, id);
        id
    }

    fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)?.children.iter().copied().find(|child| {
            self.node(*child)
                .is_some_and(|node| node.history().is_none() && node.name == name)
        })
    }

    /// Node for an absolute path, if it is in the tree.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        let relative = path.strip_prefix(&self.root_path).ok()?;
        self.find_under(self.root, relative)
    }

    pub fn find_under(&self, base: NodeId, relative: &Path) -> Option<NodeId> {
        self.node(base)?;
        relative
            .normal_components()?
            .iter()
            .try_fold(base, |current, name| self.child_named(current, name))
    }

    /// Locates `relative` below `base`, creating missing directories on the
    /// way and a leaf of `kind` at the end. Existing nodes are reused as they
    /// are. Created nodes are not marked as present on disk.
    pub fn insert_path(
        &mut self,
        base: NodeId,
        relative: &Path,
        kind: EntryKind,
    ) -> Result<NodeId, TreeError> {
        let names = relative
            .normal_components()
            .context(InvalidPathSnafu { path: relative })?;
        self.node(base).context(UnknownNodeSnafu { id: base })?;
        if self.filter.is_filtered(relative) {
            return FilteredSnafu { path: relative }.fail();
        }

        let last = names.len().saturating_sub(1);
        let mut current = base;
        for (depth, name) in names.into_iter().enumerate() {
            let parent = self.node(current).context(UnknownNodeSnafu { id: current })?;
            if !parent.is_directory() {
                return CannotInsertIntoFileSnafu { path: relative }.fail();
            }

            current = match self.child_named(current, &name) {
                Some(existing) => existing,
                None => {
                    let node_kind = if depth == last {
                        NodeKind::from(kind)
                    } else {
                        NodeKind::Directory
                    };
                    self.attach_child(current, TreeNode::new(name, Some(current), node_kind))
                }
            };
        }

        Ok(current)
    }

    /// Absolute path of a node. History entries resolve to the node they
    /// belong to.
    pub fn path_of(&self, id: NodeId) -> Option<PathBuf> {
        let relative = self.relative_path_of(id)?;
        if relative.as_os_str().is_empty() {
            return Some(self.root_path.clone());
        }
        Some(self.root_path.join(relative))
    }

    pub fn relative_path_of(&self, id: NodeId) -> Option<PathBuf> {
        let mut names = Vec::new();
        let mut current = id;
        while current != self.root {
            let node = self.node(current)?;
            if node.history().is_none() {
                names.push(node.name.as_str());
            }
            current = node.parent?;
        }
        Some(names.iter().rev().collect())
    }

    /// Removes a node and everything below it. The root cannot be deleted.
    pub fn delete_subtree(&mut self, id: NodeId) -> bool {
        if id == self.root {
            return false;
        }
        let Some(parent) = self.node(id).map(TreeNode::parent) else {
            return false;
        };
        if let Some(parent_node) = parent.and_then(|parent| self.node_mut(parent)) {
            parent_node.children.retain(|child| *child != id);
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                pending.extend(node.children);
                self.free.push(current);
            }
        }

        if let Some(parent) = parent {
            self.refresh_flags_from(parent);
        }
        true
    }

    /// Deletes `from` and then its parents while they hold nothing: no
    /// children, no state, no mount and no file on disk. Stops at `stop` and
    /// never removes the root.
    pub fn prune_empty_ancestors(&mut self, from: NodeId, stop: NodeId) -> usize {
        let mut pruned = 0;
        let mut cursor = Some(from);
        while let Some(current) = cursor {
            if current == stop || current == self.root {
                break;
            }
            let Some(node) = self.node(current) else {
                break;
            };
            if !node.is_disposable() {
                break;
            }
            cursor = node.parent;
            self.delete_subtree(current);
            pruned += 1;
        }
        pruned
    }

    pub fn set_state(
        &mut self,
        id: NodeId,
        kind: ScmKind,
        status: ScmStatus,
    ) -> Result<(), TreeError> {
        let node = self.node_mut(id).context(UnknownNodeSnafu { id })?;
        node.states.replace(kind, status);
        let parent = node.parent;
        if let Some(parent) = parent {
            self.refresh_flags_from(parent);
        }
        Ok(())
    }

    pub fn remove_state(&mut self, id: NodeId, kind: ScmKind) -> Option<ScmStatus> {
        let node = self.node_mut(id)?;
        let removed = node.states.remove(&kind);
        let parent = node.parent;
        if let (Some(_), Some(parent)) = (removed, parent) {
            self.refresh_flags_from(parent);
        }
        removed
    }

    /// The single live status found in the children of `id` (their own
    /// states and flags), `Modified` when they disagree.
    fn aggregate_flag(&self, id: NodeId) -> Option<ScmStatus> {
        let node = self.node(id)?;
        let mut statuses = node
            .children
            .iter()
            .filter_map(|child| self.node(*child))
            .flat_map(|child| child.states.values().copied().chain(child.flag))
            .filter(|status| status.is_live());

        let first = statuses.next()?;
        if statuses.all(|status| status == first) {
            Some(first)
        } else {
            Some(ScmStatus::Modified)
        }
    }

    /// Recomputes flags from `id` upwards until one comes out unchanged.
    pub fn refresh_flags_from(&mut self, id: NodeId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let flag = self.aggregate_flag(current);
            let Some(node) = self.node_mut(current) else {
                break;
            };
            if node.flag == flag {
                break;
            }
            node.flag = flag;
            cursor = node.parent;
        }
    }

    /// Moves the root up to `new_root`, an ancestor directory of the current
    /// root. Existing nodes stay in place below the new root.
    pub fn rebase(&mut self, new_root: &Path) -> Result<(), TreeError> {
        if new_root == self.root_path {
            return Ok(());
        }
        let names = self
            .root_path
            .strip_prefix(new_root)
            .ok()
            .and_then(|relative| relative.normal_components())
            .filter(|names| !names.is_empty())
            .context(NotAnAncestorSnafu {
                root: self.root_path.clone(),
                new_root,
            })?;
        let Some((old_root_name, between)) = names.split_last() else {
            return NotAnAncestorSnafu {
                root: self.root_path.clone(),
                new_root,
            }
            .fail();
        };

        let old_root = self.root;
        let mut top = TreeNode::new(new_root.to_string_lossy(), None, NodeKind::Directory);
        top.open = true;
        top.on_disk = true;
        let top = self.alloc(top);

        let mut current = top;
        for name in between {
            let mut node = TreeNode::new(name.clone(), Some(current), NodeKind::Directory);
            node.open = true;
            node.on_disk = true;
            current = self.attach_child(current, node);
        }

        if let Some(node) = self.node_mut(old_root) {
            node.name = old_root_name.clone();
            node.parent = Some(current);
        }
        self.link_child(current, old_root);

        debug!(
            "Rebased tree from {} to {}",
            self.root_path.best_effort_display(),
            new_root.best_effort_display()
        );
        self.root = top;
        self.root_path = new_root.to_path_buf();
        self.refresh_flags_from(current);
        Ok(())
    }

    /// Brings the subtree at the scan root in line with the scan. New entries
    /// are inserted, every listed entry is marked as on disk, and nodes that
    /// vanished from disk are dropped unless an SCM state, a mount or a child
    /// still holds them.
    pub fn merge_scan(&mut self, scan: &FilesystemScan) -> Result<MergeSummary, TreeError> {
        let base = self
            .find(scan.root())
            .context(OutsideTreeSnafu { path: scan.root() })?;

        for id in self.descendants(base) {
            if let Some(node) = self.node_mut(id) {
                node.on_disk = false;
            }
        }

        let mut summary = MergeSummary::default();
        for entry in scan.entries() {
            let existed = self.find_under(base, &entry.path).is_some();
            match self.insert_path(base, &entry.path, entry.kind) {
                Ok(id) => {
                    if let Some(node) = self.node_mut(id) {
                        node.on_disk = true;
                        // An SCM report may have created the node as a file first.
                        if entry.kind == EntryKind::Directory && node.kind == NodeKind::File {
                            node.kind = NodeKind::Directory;
                        }
                    }
                    if !existed {
                        summary.added += 1;
                    }
                }
                Err(err) => debug!("Scan entry not merged: {}", err),
            }
        }

        for id in self.descendants(base).into_iter().rev() {
            if self.node(id).is_some_and(TreeNode::is_disposable) {
                self.delete_subtree(id);
                summary.removed += 1;
            }
        }

        Ok(summary)
    }

    /// Replaces the history entries listed below `id` and opens it.
    pub fn set_history(&mut self, id: NodeId, entries: Vec<HistoryEntry>) -> Result<(), TreeError> {
        let node = self.node(id).context(UnknownNodeSnafu { id })?;
        let stale: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|child| self.node(*child).is_some_and(|c| c.history().is_some()))
            .collect();
        for child in stale {
            self.delete_subtree(child);
        }

        for entry in entries {
            let name = entry.short_version().to_string();
            self.attach_child(id, TreeNode::new(name, Some(id), NodeKind::History(entry)));
        }
        self.set_open(id, true);
        Ok(())
    }

    /// Opens or closes a node that can be expanded. The root always stays open.
    pub fn set_open(&mut self, id: NodeId, open: bool) -> bool {
        if id == self.root {
            return false;
        }
        match self.node_mut(id) {
            Some(node) if node.is_directory() || node.has_children() => {
                node.open = open;
                true
            }
            _ => false,
        }
    }

    /// Flips the open state, returning the new one when the node can expand.
    pub fn toggle_open(&mut self, id: NodeId) -> Option<bool> {
        let open = !self.node(id)?.open;
        self.set_open(id, open).then_some(open)
    }

    pub fn set_mount(&mut self, id: NodeId, mount: ScmMount) -> Result<(), TreeError> {
        let node = self.node_mut(id).context(UnknownNodeSnafu { id })?;
        node.mount = Some(mount);
        Ok(())
    }

    /// The closest node at or above `id` carrying an SCM mount.
    pub fn nearest_mount(&self, id: NodeId) -> Option<(NodeId, &ScmMount)> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            if let Some(mount) = &node.mount {
                return Some((current, mount));
            }
            cursor = node.parent;
        }
        None
    }

    /// All mounts in the tree, ordered by root path.
    pub fn mounts(&self) -> Vec<&ScmMount> {
        let mut mounts: Vec<_> = self
            .iter_ids()
            .filter_map(|id| self.node(id).and_then(TreeNode::mount))
            .collect();
        mounts.sort_by(|a, b| a.root.cmp(&b.root));
        mounts
    }

    pub fn clear_display_lines(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.display_line = None;
        }
    }

    pub(crate) fn set_display_line(&mut self, id: NodeId, line: usize) {
        if let Some(node) = self.node_mut(id) {
            node.display_line = Some(line);
        }
    }

    /// Opens every directory that has a status somewhere below it.
    pub fn expand_flagged(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            if node.flag.is_some() && node.is_directory() {
                node.open = true;
            }
        }
    }

    pub fn expand_all(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            if node.is_directory() {
                node.open = true;
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum TreeError {
    #[snafu(display("Path '{}' is ignored", path.display()))]
    Filtered { path: PathBuf },
    #[snafu(display("Cannot insert '{}' below a file", path.display()))]
    CannotInsertIntoFile { path: PathBuf },
    #[snafu(display("Path '{}' is not a plain relative path", path.display()))]
    InvalidPath { path: PathBuf },
    #[snafu(display("Path '{}' is outside of the tree", path.best_effort_display()))]
    OutsideTree { path: PathBuf },
    #[snafu(display(
        "Cannot rebase {} onto {}, which is not one of its ancestors",
        root.best_effort_display(),
        new_root.best_effort_display()
    ))]
    NotAnAncestor { root: PathBuf, new_root: PathBuf },
    #[snafu(display("Node {} does not exist", id))]
    UnknownNode { id: NodeId },
}
