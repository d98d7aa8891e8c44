use crate::actions::TreeAction;
use crate::filesystem::{NodeId, SourceTree};
use crate::render::RenderedTree;

/// Work the front end has to do against an SCM on behalf of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmRequest {
    /// Fetch and attach the history of this file node.
    History(NodeId),
    /// Print the patch of this history node.
    Patch(NodeId),
    /// Print the file at the version this node stands for.
    OpenVersion(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOutcome {
    pub redraw: bool,
    /// Where the cursor ends up.
    pub line: usize,
    pub request: Option<ScmRequest>,
}

impl ActionOutcome {
    fn unchanged(line: usize) -> Self {
        Self {
            redraw: false,
            line,
            request: None,
        }
    }

    fn redraw(line: usize) -> Self {
        Self {
            redraw: true,
            line,
            request: None,
        }
    }

    fn request(line: usize, request: ScmRequest) -> Self {
        Self {
            redraw: false,
            line,
            request: Some(request),
        }
    }
}

/// Applies `action` to the node drawn on `line` of the last render. Lines
/// that map to no node leave everything untouched.
pub fn apply_tree_action(
    tree: &mut SourceTree,
    rendered: &RenderedTree,
    line: usize,
    action: TreeAction,
) -> ActionOutcome {
    let Some(id) = rendered.node_at_line(line) else {
        return ActionOutcome::unchanged(line);
    };

    match action {
        TreeAction::Select => select(tree, id, line),
        TreeAction::CloseItem => close_item(tree, id, line),
        TreeAction::CloseParents => close_parents(tree, id, line),
        TreeAction::History => history(tree, id, line),
        TreeAction::Patch => match tree.node(id).and_then(|node| node.history()) {
            Some(entry) if !entry.is_placeholder() => {
                ActionOutcome::request(line, ScmRequest::Patch(id))
            }
            _ => ActionOutcome::unchanged(line),
        },
        TreeAction::OpenVersion => open_version(tree, id, line),
        TreeAction::Rescan | TreeAction::Quit => ActionOutcome::unchanged(line),
    }
}

fn select(tree: &mut SourceTree, id: NodeId, line: usize) -> ActionOutcome {
    match tree.toggle_open(id) {
        Some(_) => ActionOutcome::redraw(line),
        None => ActionOutcome::unchanged(line),
    }
}

fn close_item(tree: &mut SourceTree, id: NodeId, line: usize) -> ActionOutcome {
    let Some(node) = tree.node(id) else {
        return ActionOutcome::unchanged(line);
    };
    if node.has_children() && node.is_open() {
        tree.set_open(id, false);
        return ActionOutcome::redraw(line);
    }

    match node.parent() {
        Some(parent) if parent != tree.root() => {
            tree.set_open(parent, false);
            let line = tree
                .node(parent)
                .and_then(|parent| parent.display_line())
                .unwrap_or(line);
            ActionOutcome::redraw(line)
        }
        _ => ActionOutcome::unchanged(line),
    }
}

/// Closes the node and every ancestor below the root, leaving the cursor on
/// the top level ancestor.
fn close_parents(tree: &mut SourceTree, id: NodeId, line: usize) -> ActionOutcome {
    let root = tree.root();
    let mut redraw = tree.set_open(id, false);
    let mut top = id;
    let mut current = tree.node(id).and_then(|node| node.parent());

    while let Some(ancestor) = current.filter(|ancestor| *ancestor != root) {
        redraw |= tree.set_open(ancestor, false);
        top = ancestor;
        current = tree.node(ancestor).and_then(|node| node.parent());
    }

    let line = tree
        .node(top)
        .and_then(|node| node.display_line())
        .unwrap_or(line);
    ActionOutcome {
        redraw,
        line,
        request: None,
    }
}

/// Collapses an open history, or asks for one to be fetched.
fn history(tree: &mut SourceTree, id: NodeId, line: usize) -> ActionOutcome {
    let Some(node) = tree.node(id) else {
        return ActionOutcome::unchanged(line);
    };
    if node.is_directory() {
        return ActionOutcome::unchanged(line);
    }

    if node.history().is_some() {
        return match node.parent() {
            Some(parent) => {
                tree.toggle_open(parent);
                let line = tree
                    .node(parent)
                    .and_then(|parent| parent.display_line())
                    .unwrap_or(line);
                ActionOutcome::redraw(line)
            }
            None => ActionOutcome::unchanged(line),
        };
    }

    if node.is_open() && node.has_children() {
        tree.set_open(id, false);
        return ActionOutcome::redraw(line);
    }
    ActionOutcome::request(line, ScmRequest::History(id))
}

/// History nodes open their own version, files with SCM state the current one.
fn open_version(tree: &SourceTree, id: NodeId, line: usize) -> ActionOutcome {
    let Some(node) = tree.node(id) else {
        return ActionOutcome::unchanged(line);
    };
    let wanted = match node.history() {
        Some(entry) => !entry.is_placeholder(),
        None => !node.is_directory() && !node.states().is_empty(),
    };
    if wanted {
        ActionOutcome::request(line, ScmRequest::OpenVersion(id))
    } else {
        ActionOutcome::unchanged(line)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::filesystem::{EntryKind, IgnoreFilter};
    use crate::render::{RenderOptions, render};
    use crate::scm::{HistoryEntry, ScmKind, ScmStatus};

    fn sample_tree() -> SourceTree {
        let mut tree = SourceTree::new("/project", IgnoreFilter::default());
        let root = tree.root();
        for path in ["src/app/main.rs", "src/lib.rs", "README.md"] {
            tree.insert_path(root, Path::new(path), EntryKind::File)
                .unwrap();
        }
        tree.expand_all();
        tree
    }

    fn line_of(tree: &SourceTree, path: &str) -> usize {
        let id = tree.find(&Path::new("/project").join(path)).unwrap();
        tree.node(id).unwrap().display_line().unwrap()
    }

    fn is_open(tree: &SourceTree, path: &str) -> bool {
        let id = tree.find(&Path::new("/project").join(path)).unwrap();
        tree.node(id).unwrap().is_open()
    }

    #[test]
    fn select_toggles_directories_only() {
        let mut tree = sample_tree();
        let rendered = render(&mut tree, &RenderOptions::default());

        let src = line_of(&tree, "src");
        let outcome = apply_tree_action(&mut tree, &rendered, src, TreeAction::Select);
        assert!(outcome.redraw);
        assert!(!is_open(&tree, "src"));

        let readme = line_of(&tree, "README.md");
        let outcome = apply_tree_action(&mut tree, &rendered, readme, TreeAction::Select);
        assert_eq!(outcome, ActionOutcome::unchanged(readme));
    }

    #[test]
    fn close_item_on_a_leaf_closes_the_parent_and_moves_the_cursor() {
        let mut tree = sample_tree();
        let rendered = render(&mut tree, &RenderOptions::default());
        let main = line_of(&tree, "src/app/main.rs");
        let app = line_of(&tree, "src/app");

        let outcome = apply_tree_action(&mut tree, &rendered, main, TreeAction::CloseItem);

        assert_eq!(outcome, ActionOutcome::redraw(app));
        assert!(!is_open(&tree, "src/app"));
        assert!(is_open(&tree, "src"));
    }

    #[test]
    fn close_item_on_an_open_directory_closes_it_in_place() {
        let mut tree = sample_tree();
        let rendered = render(&mut tree, &RenderOptions::default());
        let src = line_of(&tree, "src");

        let outcome = apply_tree_action(&mut tree, &rendered, src, TreeAction::CloseItem);

        assert_eq!(outcome, ActionOutcome::redraw(src));
        assert!(!is_open(&tree, "src"));
    }

    #[test]
    fn close_parents_collapses_up_to_the_top_level() {
        let mut tree = sample_tree();
        let rendered = render(&mut tree, &RenderOptions::default());
        let main = line_of(&tree, "src/app/main.rs");
        let src = line_of(&tree, "src");

        let outcome = apply_tree_action(&mut tree, &rendered, main, TreeAction::CloseParents);

        assert!(outcome.redraw);
        assert_eq!(outcome.line, src);
        assert!(!is_open(&tree, "src/app"));
        assert!(!is_open(&tree, "src"));
        assert!(tree.node(tree.root()).unwrap().is_open());
    }

    #[test]
    fn history_is_requested_then_collapsed() {
        let mut tree = sample_tree();
        let rendered = render(&mut tree, &RenderOptions::default());
        let lib_id = tree.find(Path::new("/project/src/lib.rs")).unwrap();
        let lib = line_of(&tree, "src/lib.rs");

        let outcome = apply_tree_action(&mut tree, &rendered, lib, TreeAction::History);
        assert_eq!(outcome.request, Some(ScmRequest::History(lib_id)));

        tree.set_history(
            lib_id,
            vec![HistoryEntry {
                version: "abcdef0123".to_string(),
                author: "someone".to_string(),
                timestamp: 0,
                summary: "Initial".to_string(),
            }],
        )
        .unwrap();
        let rendered = render(&mut tree, &RenderOptions::default());

        let entry_line = lib + 1;
        let entry_id = rendered.node_at_line(entry_line).unwrap();
        assert_eq!(
            apply_tree_action(&mut tree, &rendered, entry_line, TreeAction::Patch).request,
            Some(ScmRequest::Patch(entry_id))
        );
        assert_eq!(
            apply_tree_action(&mut tree, &rendered, entry_line, TreeAction::OpenVersion).request,
            Some(ScmRequest::OpenVersion(entry_id))
        );

        let outcome = apply_tree_action(&mut tree, &rendered, entry_line, TreeAction::History);
        assert_eq!(outcome, ActionOutcome::redraw(lib));
        assert!(!tree.node(lib_id).unwrap().is_open());
    }

    #[test]
    fn scm_requests_need_something_to_show() {
        let mut tree = sample_tree();
        let readme_id = tree.find(Path::new("/project/README.md")).unwrap();
        let rendered = render(&mut tree, &RenderOptions::default());
        let readme = line_of(&tree, "README.md");
        let src = line_of(&tree, "src");

        assert_eq!(
            apply_tree_action(&mut tree, &rendered, readme, TreeAction::OpenVersion).request,
            None
        );
        assert_eq!(
            apply_tree_action(&mut tree, &rendered, readme, TreeAction::Patch).request,
            None
        );
        assert_eq!(
            apply_tree_action(&mut tree, &rendered, src, TreeAction::History).request,
            None
        );

        tree.set_state(readme_id, ScmKind::Git, ScmStatus::Modified)
            .unwrap();
        assert_eq!(
            apply_tree_action(&mut tree, &rendered, readme, TreeAction::OpenVersion).request,
            Some(ScmRequest::OpenVersion(readme_id))
        );
    }

    #[test]
    fn lines_outside_the_render_do_nothing() {
        let mut tree = sample_tree();
        let rendered = render(&mut tree, &RenderOptions::default());
        let outcome = apply_tree_action(&mut tree, &rendered, 99, TreeAction::Select);
        assert_eq!(outcome, ActionOutcome::unchanged(99));
    }
}
