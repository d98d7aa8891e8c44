use tracing::debug;

use crate::filesystem::{NodeId, SourceTree, TreeNode};
use crate::render::{DisplayOrder, MarkerSet, RenderOptions};
use crate::scm::{HistoryEntry, ScmStatus};

const LEVEL_INDENT: &str = "  ";

/// What a line is mostly about, for front ends that color their output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTone {
    Plain,
    Status(ScmStatus),
    Mount,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    pub tone: LineTone,
}

/// Result of one render pass. Line numbers are 1-based.
#[derive(Debug, Clone, Default)]
pub struct RenderedTree {
    pub lines: Vec<RenderedLine>,
    line_nodes: Vec<NodeId>,
}

impl RenderedTree {
    pub fn node_at_line(&self, line: usize) -> Option<NodeId> {
        line.checked_sub(1)
            .and_then(|index| self.line_nodes.get(index))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn push(&mut self, line: RenderedLine, id: NodeId) -> usize {
        self.lines.push(line);
        self.line_nodes.push(id);
        self.lines.len()
    }
}

/// Walks the visible part of the tree depth first and produces one line per
/// node, the root excluded. Every node's display line is reset first and then
/// set for the nodes that were emitted. Closed subtrees, ignored names and,
/// when asked for, dot files are skipped together with everything below them.
pub fn render(tree: &mut SourceTree, options: &RenderOptions) -> RenderedTree {
    tree.clear_display_lines();

    let mut rendered = RenderedTree::default();
    let mut pending: Vec<(NodeId, usize)> = ordered_children(tree, tree.root(), options.order)
        .into_iter()
        .rev()
        .map(|child| (child, 1))
        .collect();

    while let Some((id, level)) = pending.pop() {
        let Some(node) = tree.node(id) else {
            continue;
        };
        if is_hidden(tree, node, options) {
            continue;
        }

        let line = match node.history() {
            Some(entry) => history_line(level, entry),
            None => tree_line(level, node, &options.markers),
        };
        rendered.push(line, id);

        if node.is_open() && node.has_children() {
            pending.extend(
                ordered_children(tree, id, options.order)
                    .into_iter()
                    .rev()
                    .map(|child| (child, level + 1)),
            );
        }
    }

    for (index, id) in rendered.line_nodes.iter().enumerate() {
        tree.set_display_line(*id, index + 1);
    }
    debug!("Rendered {} lines", rendered.len());
    rendered
}

fn is_hidden(tree: &SourceTree, node: &TreeNode, options: &RenderOptions) -> bool {
    if node.history().is_some() {
        return false;
    }
    let name = node.name();
    (options.hide_dot_files && name.starts_with('.'))
        || tree.filter().is_directory_filtered(name)
        || tree.filter().is_suffix_filtered(name)
}

/// Children of `id` in display order. History entries always come last, in
/// the order they were attached.
fn ordered_children(tree: &SourceTree, id: NodeId, order: DisplayOrder) -> Vec<NodeId> {
    let Some(node) = tree.node(id) else {
        return Vec::new();
    };
    let (mut regular, history): (Vec<NodeId>, Vec<NodeId>) =
        node.children().iter().copied().partition(|child| {
            tree.node(*child)
                .is_some_and(|child| child.history().is_none())
        });

    let is_directory = |child: &NodeId| tree.node(*child).is_some_and(TreeNode::is_directory);
    match order {
        DisplayOrder::Alphabetic => {}
        DisplayOrder::DirectoriesFirst => regular.sort_by_key(|child| !is_directory(child)),
        DisplayOrder::FilesFirst => regular.sort_by_key(is_directory),
    }

    regular.extend(history);
    regular
}

fn tree_line(level: usize, node: &TreeNode, markers: &MarkerSet) -> RenderedLine {
    let mut text = LEVEL_INDENT.repeat(level);

    if node.is_directory() {
        text.push(markers.open_marker(node.is_open()));
        text.push(' ');
    } else {
        text.push_str("  ");
    }
    text.push_str(node.name());

    match node.mount() {
        Some(mount) => {
            text.push_str(" [");
            text.push(mount.tag());
            text.push_str("] ");
        }
        None => text.push(' '),
    }

    let mut tone = LineTone::Plain;
    if !node.states().is_empty() {
        for (kind, status) in node.states().iter() {
            text.push(kind.initial());
            text.push(markers.status_marker(*status));
            text.push(' ');
        }
        if let Some(status) = node.states().values().copied().find(|s| s.is_live()) {
            tone = LineTone::Status(status);
        }
    } else if let (true, Some(flag)) = (node.has_children(), node.flag()) {
        text.push(markers.status_marker(flag));
        tone = LineTone::Status(flag);
    }

    if node.mount().is_some() && tone == LineTone::Plain {
        tone = LineTone::Mount;
    }

    RenderedLine { text, tone }
}

fn history_line(level: usize, entry: &HistoryEntry) -> RenderedLine {
    RenderedLine {
        text: format!(
            "{} {}:{} {}",
            LEVEL_INDENT.repeat(level),
            entry.short_version(),
            entry.date_stamp(),
            entry.headline()
        ),
        tone: LineTone::History,
    }
}
