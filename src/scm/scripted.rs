use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::scm::{ChangeEvent, HistoryEntry, Scm, ScmError, ScmKind, ScmStatus};

type Script = Mutex<VecDeque<Result<HashSet<ChangeEvent>, ScmError>>>;

/// In-memory [`Scm`] that replays queued answers. An exhausted script
/// answers with an empty change set.
#[derive(Debug)]
pub struct ScriptedScm {
    root: PathBuf,
    local: Script,
    remote: Option<Script>,
    remote_calls: AtomicUsize,
    history: Vec<HistoryEntry>,
    stalled: bool,
}

impl ScriptedScm {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            local: Mutex::new(VecDeque::new()),
            remote: None,
            remote_calls: AtomicUsize::new(0),
            history: Vec::new(),
            stalled: false,
        }
    }

    pub fn with_local(
        self,
        answers: impl IntoIterator<Item = Result<HashSet<ChangeEvent>, ScmError>>,
    ) -> Self {
        Self {
            local: Mutex::new(answers.into_iter().collect()),
            ..self
        }
    }

    pub fn with_remote(
        self,
        answers: impl IntoIterator<Item = Result<HashSet<ChangeEvent>, ScmError>>,
    ) -> Self {
        Self {
            remote: Some(Mutex::new(answers.into_iter().collect())),
            ..self
        }
    }

    pub fn with_history(self, history: Vec<HistoryEntry>) -> Self {
        Self { history, ..self }
    }

    /// Local checks never answer, like a `status` hanging on a dead server.
    pub fn stalled(self) -> Self {
        Self {
            stalled: true,
            ..self
        }
    }

    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    /// Change set under this root from `(path, status)` pairs.
    pub fn changes(&self, entries: &[(&str, ScmStatus)]) -> HashSet<ChangeEvent> {
        changes(&self.root, entries)
    }
}

pub fn changes(root: &Path, entries: &[(&str, ScmStatus)]) -> HashSet<ChangeEvent> {
    entries
        .iter()
        .map(|(path, status)| ChangeEvent::new(root, ScmKind::Git, *path, *status))
        .collect()
}

pub fn failure(root: &Path) -> ScmError {
    ScmError::CommandFailed {
        program: "git".to_string(),
        args: "status".to_string(),
        root: root.to_path_buf(),
        stderr: "fatal: scripted failure".to_string(),
    }
}

fn next_answer(script: &Script) -> Result<HashSet<ChangeEvent>, ScmError> {
    script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Ok(HashSet::new()))
}

impl Scm for ScriptedScm {
    fn root(&self) -> &Path {
        &self.root
    }

    fn kind(&self) -> ScmKind {
        ScmKind::Git
    }

    async fn tree_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        if self.stalled {
            futures::future::pending::<()>().await;
        }
        next_answer(&self.local)
    }

    fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    async fn remote_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        match &self.remote {
            Some(script) => next_answer(script),
            None => Ok(HashSet::new()),
        }
    }

    async fn current_version(&self) -> Result<String, ScmError> {
        Ok("0123456789abcdef".to_string())
    }

    async fn branch(&self) -> Result<String, ScmError> {
        Ok("main".to_string())
    }

    async fn history(
        &self,
        _path: &Path,
        max_entries: usize,
    ) -> Result<Vec<HistoryEntry>, ScmError> {
        Ok(self.history.iter().take(max_entries).cloned().collect())
    }

    async fn file(&self, path: &Path, version: Option<&str>) -> Result<Vec<String>, ScmError> {
        Ok(vec![format!(
            "{}:{}",
            version.unwrap_or("HEAD"),
            path.display()
        )])
    }

    async fn patch(&self, version: &str) -> Result<Vec<String>, ScmError> {
        Ok(vec![format!("commit {version}")])
    }
}
