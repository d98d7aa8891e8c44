use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::Instant;

use futures::StreamExt;
use futures::future::{Either, select};
use futures_channel::mpsc::{self, UnboundedReceiver};
use snafu::ResultExt;
use tracing::{debug, info, warn};

use crate::actions::{ActionTable, ScmRequest, TreeAction, apply_tree_action};
use crate::application::AppContext;
use crate::application::application::{ApplicationError, PollerPoolSnafu, UpdaterSpawnSnafu};
use crate::application::display::Painter;
use crate::ext::PathDisplayExt;
use crate::filesystem::{NodeId, SourceTree};
use crate::poller::{PollDue, PollerPool, ScmPoller};
use crate::render::{RenderedTree, render};
use crate::scm::{HistoryEntry, Scm, ScmBackend};
use crate::updater::{
    SharedTree, TreeUpdater, UpdateCommand, UpdateQueue, lock_tree, update_channel,
};

const WAITING_MESSAGE: &str = "updating tree, please wait...";
const INPUT_THREAD_NAME: &str = "stdin-reader";

fn poller_for(
    context: &AppContext,
    backend: ScmBackend,
    queue: UpdateQueue,
) -> ScmPoller<ScmBackend> {
    ScmPoller::new(
        backend,
        queue,
        context.settings.scm.poll_period,
        context.settings.scm.remote_poll_period,
    )
}

/// Builds the tree, polls every repository once and prints the result.
/// Everything runs on the calling task; no thread is started.
pub async fn print_tree(context: &AppContext, all: bool) -> Result<(), ApplicationError> {
    let (queue, mut receiver) = update_channel();
    let mut updater = TreeUpdater::new(context.tree.clone(), context.status.clone());
    updater.build_initial_tree();
    let _ = updater.handle(UpdateCommand::ScmRootsChanged(context.mounts.clone()));

    for backend in &context.backends {
        let mut poller = poller_for(context, backend.clone(), queue.clone());
        poller.poll_once(PollDue::BOTH).await;
    }
    drop(queue);
    let _ = updater.drain_ready(&mut receiver);

    let (rendered, mounts) = {
        let mut tree = lock_tree(&context.tree);
        if all {
            tree.expand_all();
        } else {
            tree.expand_flagged();
        }
        let rendered = render(&mut tree, &context.render_options);
        (rendered, tree.mounts().into_iter().cloned().collect::<Vec<_>>())
    };

    let painter = Painter::detect();
    if let Err(err) = painter.print(&painter.tree_text(&rendered, &mounts, None)) {
        warn!("Failed to write the tree: {}", err);
    }
    Ok(())
}

/// Keeps the tree up to date until `q`, end of input or Ctrl-C.
pub async fn watch(context: AppContext) -> Result<(), ApplicationError> {
    let (queue, receiver) = update_channel();
    let updater = TreeUpdater::new(context.tree.clone(), context.status.clone())
        .spawn(queue, receiver)
        .context(UpdaterSpawnSnafu)?;
    let queue = updater.queue().clone();
    queue.push(UpdateCommand::ScmRootsChanged(context.mounts.clone()));

    let pollers: Vec<_> = context
        .backends
        .iter()
        .map(|backend| poller_for(&context, backend.clone(), queue.clone()))
        .collect();
    let mut pool = PollerPool::new(pollers.len()).context(PollerPoolSnafu)?;
    pool.start(pollers).context(PollerPoolSnafu)?;
    if pool.is_empty() {
        info!("No repositories found, watching the file system only");
    } else {
        debug!("Running {} pollers", pool.len());
    }

    let mut input = spawn_input_reader();
    let mut ctrl_c = pin!(compio::signal::ctrl_c());
    let mut session = WatchSession::new(&context, queue);
    let mut next_rescan = Instant::now() + context.settings.ui.rescan_period;

    loop {
        let tick = pin!(compio::time::sleep(context.settings.ui.render_period));
        match select(tick, select(input.next(), ctrl_c.as_mut())).await {
            Either::Left(_) => {
                if Instant::now() >= next_rescan {
                    session.queue.push(UpdateCommand::RebuildTree);
                    next_rescan = Instant::now() + context.settings.ui.rescan_period;
                }
                session.refresh();
            }
            Either::Right((Either::Left((Some(line), _)), _)) => {
                if session.handle_input(&line).await.is_break() {
                    break;
                }
                session.refresh();
            }
            Either::Right((Either::Left((None, _)), _)) => {
                debug!("End of input");
                break;
            }
            Either::Right((Either::Right((signal, _)), _)) => {
                if let Err(err) = signal {
                    warn!("Failed to wait for Ctrl-C: {}", err);
                }
                break;
            }
        }
    }

    info!("Shutting down");
    let timeout = context.settings.ui.shutdown_timeout;
    let abandoned = pool.shutdown(timeout).await;
    if abandoned > 0 {
        warn!("Abandoned {} pollers that did not stop in time", abandoned);
    }
    if !updater.shutdown(timeout).await {
        warn!("Tree updater did not shut down cleanly");
    }
    Ok(())
}

/// Forwards stdin lines from a blocking reader thread.
fn spawn_input_reader() -> UnboundedReceiver<String> {
    let (sender, receiver) = mpsc::unbounded();
    let spawned = std::thread::Builder::new()
        .name(INPUT_THREAD_NAME.to_string())
        .spawn(move || {
            for line in io::stdin().lines() {
                match line {
                    Ok(line) => {
                        if sender.unbounded_send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Failed to read from stdin: {}", err);
                        break;
                    }
                }
            }
        });
    if let Err(err) = spawned {
        warn!("Cannot read commands from stdin: {}", err);
    }
    receiver
}

/// UI side state of the watch loop.
struct WatchSession<'a> {
    context: &'a AppContext,
    queue: UpdateQueue,
    table: ActionTable,
    painter: Painter,
    rendered: RenderedTree,
    cursor: usize,
    announced_wait: bool,
    expanded_once: bool,
}

impl<'a> WatchSession<'a> {
    fn new(context: &'a AppContext, queue: UpdateQueue) -> Self {
        Self {
            context,
            queue,
            table: ActionTable::default(),
            painter: Painter::detect(),
            rendered: RenderedTree::default(),
            cursor: 1,
            announced_wait: false,
            expanded_once: false,
        }
    }

    /// Redraws when the updater marked the tree dirty.
    fn refresh(&mut self) {
        let status = &self.context.status;
        if !status.is_ready() {
            if !self.announced_wait {
                self.show(&[WAITING_MESSAGE.to_string()]);
                self.announced_wait = true;
            }
            return;
        }
        if !status.take_dirty() {
            return;
        }

        let mounts = {
            let mut tree = lock_tree(&self.context.tree);
            if !self.expanded_once {
                tree.expand_flagged();
                self.expanded_once = true;
            }
            self.rendered = render(&mut tree, &self.context.render_options);
            tree.mounts().into_iter().cloned().collect::<Vec<_>>()
        };
        self.cursor = self.cursor.clamp(1, self.rendered.len().max(1));

        let text = self
            .painter
            .tree_text(&self.rendered, &mounts, Some(self.cursor));
        self.show(&text);
    }

    async fn handle_input(&mut self, input: &str) -> ControlFlow<()> {
        let request = match self.table.parse(input) {
            Ok(request) => request,
            Err(err) => {
                let mut help = vec![err.to_string()];
                help.extend(self.table.help());
                self.show(&help);
                return ControlFlow::Continue(());
            }
        };
        let line = request.line.unwrap_or(self.cursor);

        match request.action {
            TreeAction::Quit => return ControlFlow::Break(()),
            TreeAction::Rescan => {
                self.queue.push(UpdateCommand::RebuildTree);
            }
            action => {
                let outcome = {
                    let mut tree = lock_tree(&self.context.tree);
                    apply_tree_action(&mut tree, &self.rendered, line, action)
                };
                self.cursor = outcome.line;
                if let Some(request) = outcome.request {
                    let output = self.scm_request(request).await;
                    self.show(&output);
                }
                if outcome.redraw || outcome.request.is_some() {
                    self.context.status.mark_dirty();
                }
            }
        }
        ControlFlow::Continue(())
    }

    async fn scm_request(&self, request: ScmRequest) -> Vec<String> {
        let owner = {
            let tree = lock_tree(&self.context.tree);
            file_node(&tree, request_node(request)).and_then(|id| {
                let path = tree.path_of(id)?;
                let mount = tree.nearest_mount(id).map(|(_, mount)| mount.root.clone());
                Some(mount.unwrap_or(path))
            })
        };
        let Some(path) = owner else {
            return Vec::new();
        };
        match self.context.backend_for(&path) {
            Some(scm) => {
                run_scm_request(
                    &self.context.tree,
                    &self.queue,
                    scm,
                    request,
                    self.context.settings.scm.number_history_items,
                )
                .await
            }
            None => {
                warn!("No repository owns {}", path.best_effort_display());
                Vec::new()
            }
        }
    }

    fn show(&self, lines: &[String]) {
        if let Err(err) = self.painter.print(lines) {
            warn!("Failed to write to stdout: {}", err);
        }
    }
}

fn request_node(request: ScmRequest) -> NodeId {
    match request {
        ScmRequest::History(id) | ScmRequest::Patch(id) | ScmRequest::OpenVersion(id) => id,
    }
}

/// History entries stand for their parent file.
fn file_node(tree: &SourceTree, id: NodeId) -> Option<NodeId> {
    let node = tree.node(id)?;
    match node.history() {
        Some(_) => node.parent(),
        None => Some(id),
    }
}

struct RequestTarget {
    /// Absolute path of the file the request is about.
    path: PathBuf,
    relative: PathBuf,
    version: Option<String>,
}

fn request_target(tree: &SourceTree, scm_root: &Path, id: NodeId) -> Option<RequestTarget> {
    let file = file_node(tree, id)?;
    let version = tree
        .node(id)?
        .history()
        .map(|entry| entry.version.clone());
    let path = tree.path_of(file)?;
    let relative = path.strip_prefix(scm_root).ok()?.to_path_buf();
    Some(RequestTarget {
        path,
        relative,
        version,
    })
}

/// Resolves an SCM backed action. History is handed to the updater to
/// attach; patches and file versions come back as lines to print.
async fn run_scm_request<S: Scm>(
    tree: &SharedTree,
    queue: &UpdateQueue,
    scm: &S,
    request: ScmRequest,
    history_items: usize,
) -> Vec<String> {
    let target = request_target(&lock_tree(tree), scm.root(), request_node(request));
    let Some(target) = target else {
        return Vec::new();
    };

    match request {
        ScmRequest::History(_) => {
            let entries = match scm.history(&target.relative, history_items).await {
                Ok(entries) if !entries.is_empty() => entries,
                Ok(_) => vec![HistoryEntry::placeholder("No history")],
                Err(err) => {
                    warn!("Failed to read history of {}: {}", target.relative.display(), err);
                    vec![HistoryEntry::placeholder("History unavailable")]
                }
            };
            if !queue.push(UpdateCommand::AttachHistory {
                path: target.path,
                entries,
            }) {
                warn!("Tree updater is gone, history of {} dropped", target.relative.display());
            }
            Vec::new()
        }
        ScmRequest::Patch(_) => {
            let Some(version) = target.version else {
                return Vec::new();
            };
            scm.patch(&version).await.unwrap_or_else(|err| {
                warn!("Failed to read patch {}: {}", version, err);
                Vec::new()
            })
        }
        ScmRequest::OpenVersion(_) => {
            let version = match target.version {
                Some(version) => version,
                None => match scm.current_version().await {
                    Ok(version) => version,
                    Err(err) => {
                        warn!("Failed to read the current version: {}", err);
                        return Vec::new();
                    }
                },
            };
            match scm.file(&target.relative, Some(&version)).await {
                Ok(contents) => {
                    let mut lines = vec![format!("{}:{}", version, target.relative.display())];
                    lines.extend(contents);
                    lines
                }
                Err(err) => {
                    warn!("Failed to read {}: {}", target.relative.display(), err);
                    Vec::new()
                }
            }
        }
    }
}
