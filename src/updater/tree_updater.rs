use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use derive_more::Display;
use futures::StreamExt;
use futures_channel::oneshot;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::ext::PathDisplayExt;
use crate::filesystem::{EntryKind, FilesystemScan, SourceTree, TreeError};
use crate::scm::{ChangeEvent, HistoryEntry, ScmMount, ScmStatus};
use crate::updater::{UpdateCommand, UpdateQueue, UpdateReceiver, UpdaterStatus};

pub type SharedTree = Arc<Mutex<SourceTree>>;

const THREAD_NAME: &str = "tree-updater";

pub fn shared_tree(tree: SourceTree) -> SharedTree {
    Arc::new(Mutex::new(tree))
}

/// Locks the tree, carrying on with the data of a poisoned lock.
pub fn lock_tree(tree: &SharedTree) -> MutexGuard<'_, SourceTree> {
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UpdaterState {
    #[display("uninitialized")]
    Uninitialized,
    #[display("building initial tree")]
    BuildingInitialTree,
    #[display("idle")]
    Idle,
    #[display("draining")]
    Draining,
}

/// The only writer of the shared tree. Commands are applied one at a time,
/// each under a single hold of the tree lock.
pub struct TreeUpdater {
    tree: SharedTree,
    status: Arc<UpdaterStatus>,
    state: UpdaterState,
}

impl TreeUpdater {
    pub fn new(tree: SharedTree, status: Arc<UpdaterStatus>) -> Self {
        Self {
            tree,
            status,
            state: UpdaterState::Uninitialized,
        }
    }

    pub fn state(&self) -> UpdaterState {
        self.state
    }

    /// Moves the updater onto its own thread. The returned handle holds a
    /// producer so it can always deliver the shutdown command.
    pub fn spawn(
        self,
        queue: UpdateQueue,
        receiver: UpdateReceiver,
    ) -> Result<TreeUpdaterHandle, UpdaterError> {
        let (exit_sender, exit) = oneshot::channel();
        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                futures::executor::block_on(self.run(receiver));
                let _ = exit_sender.send(());
            })
            .context(SpawnThreadSnafu)?;

        Ok(TreeUpdaterHandle {
            queue,
            exit,
            thread,
        })
    }

    /// Builds the initial tree, then applies commands until `Shutdown` or
    /// until every producer is gone.
    pub async fn run(mut self, mut receiver: UpdateReceiver) {
        self.build_initial_tree();

        while let Some(command) = receiver.next().await {
            self.state = UpdaterState::Draining;
            if self.handle(command).is_break() || self.drain_ready(&mut receiver).is_break() {
                break;
            }
            self.state = UpdaterState::Idle;
        }
        debug!("Tree updater stopped while {}", self.state());
    }

    pub fn build_initial_tree(&mut self) {
        self.state = UpdaterState::BuildingInitialTree;
        self.rebuild();
        self.status.mark_ready();
        self.state = UpdaterState::Idle;
        info!("Initial tree built");
    }

    /// Applies every command already waiting in the queue without blocking.
    pub fn drain_ready(&mut self, receiver: &mut UpdateReceiver) -> ControlFlow<()> {
        loop {
            match receiver.try_next() {
                Ok(Some(command)) => self.handle(command)?,
                Ok(None) => return ControlFlow::Break(()),
                Err(_) => return ControlFlow::Continue(()),
            }
        }
    }

    pub fn handle(&mut self, command: UpdateCommand) -> ControlFlow<()> {
        let outcome = match command {
            UpdateCommand::RebuildTree => {
                self.rebuild();
                Ok(())
            }
            UpdateCommand::ApplyChange(event) => self.apply_change(&event),
            UpdateCommand::ClearChange(event) => self.clear_change(&event),
            UpdateCommand::ScmRootsChanged(mounts) => self.attach_mounts(&mounts),
            UpdateCommand::AttachHistory { path, entries } => self.attach_history(&path, entries),
            UpdateCommand::Shutdown => {
                debug!("Tree updater received shutdown");
                return ControlFlow::Break(());
            }
        };

        match outcome {
            Ok(()) => self.status.mark_dirty(),
            Err(err) => warn!("Skipped tree update: {}", err),
        }
        ControlFlow::Continue(())
    }

    /// Rescans the filesystem below the tree root. The scan runs without the
    /// lock; only the merge holds it.
    fn rebuild(&mut self) {
        let (root_path, filter) = {
            let tree = lock_tree(&self.tree);
            (tree.root_path().to_path_buf(), tree.filter().clone())
        };
        let scan = FilesystemScan::collect(&root_path, &filter);

        let mut tree = lock_tree(&self.tree);
        match tree.merge_scan(&scan) {
            Ok(summary) => {
                debug!(
                    "Merged scan of {}: {} added, {} removed, {} unreadable, {} nodes",
                    root_path.best_effort_display(),
                    summary.added,
                    summary.removed,
                    scan.skipped(),
                    tree.len()
                );
                self.status.mark_dirty();
            }
            Err(err) => warn!("Could not merge filesystem scan: {}", err),
        }
    }

    fn apply_change(&mut self, event: &ChangeEvent) -> Result<(), UpdateError> {
        let mut tree = lock_tree(&self.tree);
        let scm_root = tree.find(event.root()).context(UnknownRootSnafu {
            root: event.root(),
        })?;
        let kind = if event.is_directory() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let node = tree
            .insert_path(scm_root, event.path(), kind)
            .context(UnresolvablePathSnafu {
                path: event.root().join(event.path()),
            })?;
        tree.set_state(node, event.kind(), event.status())
            .context(UnresolvablePathSnafu {
                path: event.root().join(event.path()),
            })?;
        debug!(
            "Applied {} to {}",
            event.status(),
            event.path().display()
        );
        Ok(())
    }

    fn clear_change(&mut self, event: &ChangeEvent) -> Result<(), UpdateError> {
        let mut tree = lock_tree(&self.tree);
        let scm_root = tree.find(event.root()).context(UnknownRootSnafu {
            root: event.root(),
        })?;
        let node = tree
            .find_under(scm_root, event.path())
            .context(UnknownPathSnafu {
                path: event.root().join(event.path()),
            })?;

        let removed = tree.remove_state(node, event.kind());
        let never_on_disk = tree.node(node).is_some_and(|node| !node.on_disk());
        if removed == Some(ScmStatus::Added) && never_on_disk {
            let parent = tree.node(node).and_then(|node| node.parent());
            tree.delete_subtree(node);
            if let Some(parent) = parent {
                tree.prune_empty_ancestors(parent, scm_root);
            }
            debug!("Removed reverted addition {}", event.path().display());
        } else {
            debug!("Cleared status of {}", event.path().display());
        }
        Ok(())
    }

    fn attach_history(
        &mut self,
        path: &Path,
        entries: Vec<HistoryEntry>,
    ) -> Result<(), UpdateError> {
        let mut tree = lock_tree(&self.tree);
        let node = tree.find(path).context(UnknownPathSnafu { path })?;
        let count = entries.len();
        tree.set_history(node, entries)
            .context(UnresolvablePathSnafu { path })?;
        debug!("Attached {} history entries to {}", count, path.display());
        Ok(())
    }

    /// Attaches SCM identity to the node of every root, moving the tree root
    /// up first when a repository encloses it.
    fn attach_mounts(&mut self, mounts: &[ScmMount]) -> Result<(), UpdateError> {
        let mut rebased = false;
        {
            let mut tree = lock_tree(&self.tree);
            for mount in mounts {
                let root_path = tree.root_path().to_path_buf();
                if root_path.starts_with(&mount.root) && root_path != mount.root {
                    tree.rebase(&mount.root).context(MountSnafu {
                        root: mount.root.clone(),
                    })?;
                    rebased = true;
                }

                let node = match mount.root.strip_prefix(tree.root_path()) {
                    Ok(relative) => {
                        let base = tree.root();
                        tree.insert_path(base, relative, EntryKind::Directory)
                            .context(MountSnafu {
                                root: mount.root.clone(),
                            })?
                    }
                    Err(_) => {
                        warn!(
                            "SCM root {} is outside of the tree",
                            mount.root.best_effort_display()
                        );
                        continue;
                    }
                };
                tree.set_mount(node, mount.clone()).context(MountSnafu {
                    root: mount.root.clone(),
                })?;
                debug!("Attached {} mount at {}", mount.kind, mount.root.display());
            }
        }

        if rebased {
            self.rebuild();
        }
        Ok(())
    }
}

/// Owner side of a spawned [`TreeUpdater`].
pub struct TreeUpdaterHandle {
    queue: UpdateQueue,
    exit: oneshot::Receiver<()>,
    thread: JoinHandle<()>,
}

impl TreeUpdaterHandle {
    pub fn queue(&self) -> &UpdateQueue {
        &self.queue
    }

    /// Queues `Shutdown` and waits up to `timeout` for the thread to finish.
    /// A thread that does not finish in time is left running detached.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.queue.push(UpdateCommand::Shutdown);

        match compio::time::timeout(timeout, self.exit).await {
            Ok(Ok(())) => {
                if self.thread.join().is_err() {
                    warn!("Tree updater thread panicked");
                }
                true
            }
            Ok(Err(_)) => {
                warn!("Tree updater exited without signalling");
                false
            }
            Err(_) => {
                warn!(
                    "Tree updater did not stop within {:?}, detaching it",
                    timeout
                );
                false
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum UpdaterError {
    #[snafu(display("Failed to spawn the tree updater thread"))]
    SpawnThreadError { source: std::io::Error },
}

/// Reasons a single command left the tree untouched.
#[derive(Debug, Snafu)]
pub enum UpdateError {
    #[snafu(display("SCM root {} is not in the tree", root.best_effort_display()))]
    UnknownRoot { root: PathBuf },
    #[snafu(display("{} is not in the tree", path.best_effort_display()))]
    UnknownPath { path: PathBuf },
    #[snafu(display("Cannot place {} in the tree", path.best_effort_display()))]
    UnresolvablePath { path: PathBuf, source: TreeError },
    #[snafu(display("Cannot attach SCM root {}", root.best_effort_display()))]
    MountError { root: PathBuf, source: TreeError },
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::filesystem::{IgnoreFilter, NodeId};
    use crate::scm::ScmKind;
    use crate::updater::update_channel;

    struct Fixture {
        _temp_dir: TempDir,
        root: PathBuf,
        tree: SharedTree,
        status: Arc<UpdaterStatus>,
        updater: TreeUpdater,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
        fs::write(root.join("README.md"), "").unwrap();

        let tree = shared_tree(SourceTree::new(&root, IgnoreFilter::new(["swp"], [".git"])));
        let status = Arc::new(UpdaterStatus::default());
        let updater = TreeUpdater::new(tree.clone(), status.clone());
        Fixture {
            _temp_dir: temp_dir,
            root,
            tree,
            status,
            updater,
        }
    }

    fn event(root: &Path, path: &str, status: ScmStatus) -> ChangeEvent {
        ChangeEvent::new(root, ScmKind::Git, path, status)
    }

    fn find(fixture: &Fixture, path: &str) -> Option<NodeId> {
        lock_tree(&fixture.tree).find(&fixture.root.join(path))
    }

    fn flagged_paths(tree: &SourceTree) -> Vec<PathBuf> {
        let mut paths: Vec<_> = tree
            .iter_ids()
            .filter(|id| tree.node(*id).is_some_and(|node| node.flag().is_some()))
            .filter_map(|id| tree.path_of(id))
            .collect();
        paths.sort();
        paths
    }

    fn ancestors_of_stateful_nodes(tree: &SourceTree) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = tree
            .iter_ids()
            .filter(|id| tree.node(*id).is_some_and(|node| !node.states().is_empty()))
            .filter_map(|id| tree.path_of(id))
            .flat_map(|path| {
                path.ancestors()
                    .skip(1)
                    .map(Path::to_path_buf)
                    .collect::<Vec<_>>()
            })
            .filter(|path| path.starts_with(tree.root_path()))
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    #[test]
    fn initial_build_scans_and_marks_ready() {
        let mut fixture = fixture();
        assert_eq!(fixture.updater.state(), UpdaterState::Uninitialized);

        fixture.updater.build_initial_tree();

        assert_eq!(fixture.updater.state(), UpdaterState::Idle);
        assert!(fixture.status.is_ready());
        assert!(fixture.status.take_dirty());
        assert!(find(&fixture, "src/lib.rs").is_some());
        assert!(find(&fixture, "README.md").is_some());
    }

    #[test]
    fn flags_match_ancestors_of_stateful_nodes() {
        let mut fixture = fixture();
        let root = fixture.root.clone();
        let events = [
            event(&root, "src/lib.rs", ScmStatus::Modified),
            event(&root, "src/new/deep/file.rs", ScmStatus::Added),
            event(&root, "docs/guide.md", ScmStatus::Unknown),
            event(&root, "src/lib.rs", ScmStatus::Deleted),
        ];
        for change in events {
            let _ = fixture.updater.handle(UpdateCommand::ApplyChange(change));
        }
        let _ = fixture.updater.handle(UpdateCommand::ClearChange(event(
            &root,
            "docs/guide.md",
            ScmStatus::Unknown,
        )));

        let tree = lock_tree(&fixture.tree);
        assert_eq!(flagged_paths(&tree), ancestors_of_stateful_nodes(&tree));
        assert!(!flagged_paths(&tree).is_empty());
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        let change = event(&fixture.root, "src/lib.rs", ScmStatus::Modified);

        let _ = fixture.updater.handle(UpdateCommand::ApplyChange(change.clone()));
        let once = format!("{:?}", lock_tree(&fixture.tree));
        let _ = fixture.updater.handle(UpdateCommand::ApplyChange(change));
        let twice = format!("{:?}", lock_tree(&fixture.tree));

        assert_eq!(once, twice);
    }

    #[test]
    fn clearing_an_addition_removes_the_node_and_its_scaffolding() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        let before = lock_tree(&fixture.tree).len();
        let change = event(&fixture.root, "brand/new/file.rs", ScmStatus::Added);

        let _ = fixture.updater.handle(UpdateCommand::ApplyChange(change.clone()));
        assert!(find(&fixture, "brand/new/file.rs").is_some());
        let _ = fixture.updater.handle(UpdateCommand::ClearChange(change));

        assert!(find(&fixture, "brand/new/file.rs").is_none());
        assert!(find(&fixture, "brand").is_none());
        assert_eq!(lock_tree(&fixture.tree).len(), before);
        let tree = lock_tree(&fixture.tree);
        assert_eq!(tree.node(tree.root()).unwrap().flag(), None);
    }

    #[test]
    fn clearing_a_modification_keeps_the_node() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        let change = event(&fixture.root, "src/lib.rs", ScmStatus::Modified);

        let _ = fixture.updater.handle(UpdateCommand::ApplyChange(change.clone()));
        let _ = fixture.updater.handle(UpdateCommand::ClearChange(change));

        let node = find(&fixture, "src/lib.rs").unwrap();
        let tree = lock_tree(&fixture.tree);
        assert!(tree.node(node).unwrap().states().is_empty());
        let src = find_in(&tree, &fixture.root, "src");
        assert_eq!(tree.node(src).unwrap().flag(), None);
    }

    fn find_in(tree: &SourceTree, root: &Path, path: &str) -> NodeId {
        tree.find(&root.join(path)).unwrap()
    }

    #[test]
    fn unresolvable_changes_are_skipped() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        fixture.status.take_dirty();
        let before = lock_tree(&fixture.tree).len();

        let outside = event(Path::new("/somewhere/else"), "file.rs", ScmStatus::Added);
        let filtered = event(&fixture.root, "src/.git/index", ScmStatus::Modified);
        let missing = event(&fixture.root, "never/there.rs", ScmStatus::Modified);
        assert!(fixture.updater.handle(UpdateCommand::ApplyChange(outside)).is_continue());
        assert!(fixture.updater.handle(UpdateCommand::ApplyChange(filtered)).is_continue());
        assert!(fixture.updater.handle(UpdateCommand::ClearChange(missing)).is_continue());

        assert_eq!(lock_tree(&fixture.tree).len(), before);
        assert!(!fixture.status.take_dirty());
    }

    #[test]
    fn mounts_attach_and_rebase_above_the_root() {
        let mut fixture = fixture();
        let project = fixture.root.join("project");
        fs::create_dir_all(project.join("vendor/lib")).unwrap();
        fs::write(project.join("vendor/lib/mod.rs"), "").unwrap();

        let tree = shared_tree(SourceTree::new(&project, IgnoreFilter::default()));
        let status = Arc::new(UpdaterStatus::default());
        let mut updater = TreeUpdater::new(tree.clone(), status);
        updater.build_initial_tree();
        fixture.updater = updater;
        fixture.tree = tree;

        let outer = ScmMount {
            root: fixture.root.clone(),
            kind: ScmKind::Git,
            submodule: false,
            branch: Some("main".to_string()),
        };
        let nested = ScmMount {
            root: project.join("vendor/lib"),
            kind: ScmKind::Git,
            submodule: true,
            branch: None,
        };
        let _ = fixture
            .updater
            .handle(UpdateCommand::ScmRootsChanged(vec![outer.clone(), nested.clone()]));

        let tree = lock_tree(&fixture.tree);
        assert_eq!(tree.root_path(), fixture.root.as_path());
        assert_eq!(tree.node(tree.root()).unwrap().mount(), Some(&outer));
        let nested_node = tree.find(&project.join("vendor/lib")).unwrap();
        assert_eq!(tree.node(nested_node).unwrap().mount(), Some(&nested));
        assert!(tree.find(&fixture.root.join("README.md")).is_some());
        assert!(tree.find(&project.join("vendor/lib/mod.rs")).is_some());
    }

    #[test]
    fn rebuild_prunes_deleted_files() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        fs::remove_file(fixture.root.join("README.md")).unwrap();
        fs::write(fixture.root.join("NEW.md"), "").unwrap();

        let _ = fixture.updater.handle(UpdateCommand::RebuildTree);

        assert!(find(&fixture, "README.md").is_none());
        assert!(find(&fixture, "NEW.md").is_some());
    }

    #[test]
    fn shutdown_stops_handling() {
        let mut fixture = fixture();
        assert!(fixture.updater.handle(UpdateCommand::Shutdown).is_break());
    }

    #[test]
    fn drain_ready_applies_queued_commands_in_order() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        let (queue, mut receiver) = update_channel();
        let change = event(&fixture.root, "src/added.rs", ScmStatus::Added);
        queue.push(UpdateCommand::ApplyChange(change.clone()));
        queue.push(UpdateCommand::ClearChange(change));

        assert!(fixture.updater.drain_ready(&mut receiver).is_continue());
        assert!(find(&fixture, "src/added.rs").is_none());

        queue.push(UpdateCommand::Shutdown);
        queue.push(UpdateCommand::RebuildTree);
        assert!(fixture.updater.drain_ready(&mut receiver).is_break());
    }

    #[compio::test]
    async fn spawned_updater_processes_queue_and_shuts_down() {
        let fixture = fixture();
        let (queue, receiver) = update_channel();
        let handle = fixture
            .updater
            .spawn(queue.clone(), receiver)
            .expect("Failed to spawn updater");

        queue.push(UpdateCommand::ApplyChange(event(
            &fixture.root,
            "src/lib.rs",
            ScmStatus::Modified,
        )));
        assert!(handle.shutdown(Duration::from_secs(5)).await);

        assert!(fixture.status.is_ready());
        let tree = lock_tree(&fixture.tree);
        let lib = tree.find(&fixture.root.join("src/lib.rs")).unwrap();
        assert_eq!(
            tree.node(lib).unwrap().states().get(&ScmKind::Git),
            Some(&ScmStatus::Modified)
        );
    }

    #[rstest]
    #[case::reported_as_directory(true)]
    #[case::reported_as_file(false)]
    fn untracked_nested_repository_becomes_a_directory(#[case] directory_bit: bool) {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        fs::create_dir_all(fixture.root.join("newrepo/.git")).unwrap();
        fs::write(fixture.root.join("newrepo/inside.rs"), "").unwrap();

        let change = event(&fixture.root, "newrepo", ScmStatus::Unknown);
        let change = if directory_bit {
            change.into_directory()
        } else {
            change
        };
        let _ = fixture.updater.handle(UpdateCommand::ApplyChange(change));
        let _ = fixture.updater.handle(UpdateCommand::RebuildTree);

        let newrepo = find(&fixture, "newrepo").unwrap();
        let tree = lock_tree(&fixture.tree);
        assert!(tree.node(newrepo).unwrap().is_directory());
        assert!(tree.find(&fixture.root.join("newrepo/inside.rs")).is_some());
        assert!(tree.find(&fixture.root.join("newrepo/.git")).is_none());
    }

    #[test]
    fn clearing_one_engine_leaves_the_other_in_place() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        let git = event(&fixture.root, "src/lib.rs", ScmStatus::Modified);
        let p4 = ChangeEvent::new(&fixture.root, ScmKind::P4, "src/lib.rs", ScmStatus::OutOfDate);

        let _ = fixture.updater.handle(UpdateCommand::ApplyChange(git.clone()));
        let _ = fixture.updater.handle(UpdateCommand::ApplyChange(p4));
        let _ = fixture.updater.handle(UpdateCommand::ClearChange(git));

        let lib = find(&fixture, "src/lib.rs").unwrap();
        let tree = lock_tree(&fixture.tree);
        let states: Vec<_> = tree
            .node(lib)
            .unwrap()
            .states()
            .iter()
            .map(|(kind, status)| (*kind, *status))
            .collect();
        assert_eq!(states, vec![(ScmKind::P4, ScmStatus::OutOfDate)]);
        let src = find_in(&tree, &fixture.root, "src");
        assert_eq!(tree.node(src).unwrap().flag(), Some(ScmStatus::OutOfDate));
    }

    #[test]
    fn history_is_attached_by_the_updater() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        fixture.status.take_dirty();
        let entry = HistoryEntry {
            version: "0123456789abcdef".to_string(),
            author: "someone".to_string(),
            timestamp: 0,
            summary: "first".to_string(),
        };

        let path = fixture.root.join("src/lib.rs");
        let _ = fixture.updater.handle(UpdateCommand::AttachHistory {
            path: path.clone(),
            entries: vec![entry.clone()],
        });

        assert!(fixture.status.take_dirty());
        let tree = lock_tree(&fixture.tree);
        let lib = tree.find(&path).unwrap();
        let node = tree.node(lib).unwrap();
        assert!(node.is_open());
        let child = tree.node(node.children()[0]).unwrap();
        assert_eq!(child.history(), Some(&entry));
    }

    #[test]
    fn history_for_a_missing_node_is_skipped() {
        let mut fixture = fixture();
        fixture.updater.build_initial_tree();
        fixture.status.take_dirty();

        let flow = fixture.updater.handle(UpdateCommand::AttachHistory {
            path: fixture.root.join("never/there.rs"),
            entries: vec![HistoryEntry::placeholder("nothing")],
        });

        assert!(flow.is_continue());
        assert!(!fixture.status.take_dirty());
    }

    #[compio::test]
    async fn shutdown_gives_up_on_a_blocked_updater() {
        let fixture = fixture();
        let (queue, receiver) = update_channel();
        let guard = lock_tree(&fixture.tree);
        let handle = fixture
            .updater
            .spawn(queue, receiver)
            .expect("Failed to spawn updater");

        assert!(!handle.shutdown(Duration::from_millis(50)).await);
        assert!(!fixture.status.is_ready());
        drop(guard);
    }
}
