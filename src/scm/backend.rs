use std::collections::HashSet;
use std::path::{Path, PathBuf};

use snafu::Snafu;

use crate::ext::PathDisplayExt;
use crate::scm::{ChangeEvent, GitScm, HistoryEntry, P4Scm, ScmKind};

/// The operations the tree pipeline needs from a source control engine.
pub trait Scm {
    /// Absolute path of the working copy root.
    fn root(&self) -> &Path;

    fn kind(&self) -> ScmKind;

    /// Changes in the local working copy, relative to [`Scm::root`].
    async fn tree_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError>;

    /// Whether [`Scm::remote_changes`] needs to talk to a server.
    fn has_remote(&self) -> bool {
        false
    }

    /// Changes known to the server but not yet in the working copy.
    async fn remote_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        Ok(HashSet::new())
    }

    async fn current_version(&self) -> Result<String, ScmError>;

    async fn branch(&self) -> Result<String, ScmError>;

    async fn history(
        &self,
        path: &Path,
        max_entries: usize,
    ) -> Result<Vec<HistoryEntry>, ScmError>;

    /// Contents of `path` at `version`, or at the current version when `None`.
    async fn file(&self, path: &Path, version: Option<&str>) -> Result<Vec<String>, ScmError>;

    async fn patch(&self, version: &str) -> Result<Vec<String>, ScmError>;
}

#[derive(Debug, Clone)]
pub enum ScmBackend {
    Git(GitScm),
    P4(P4Scm),
}

impl Scm for ScmBackend {
    fn root(&self) -> &Path {
        match self {
            ScmBackend::Git(scm) => scm.root(),
            ScmBackend::P4(scm) => scm.root(),
        }
    }

    fn kind(&self) -> ScmKind {
        match self {
            ScmBackend::Git(scm) => scm.kind(),
            ScmBackend::P4(scm) => scm.kind(),
        }
    }

    async fn tree_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        match self {
            ScmBackend::Git(scm) => scm.tree_changes().await,
            ScmBackend::P4(scm) => scm.tree_changes().await,
        }
    }

    fn has_remote(&self) -> bool {
        match self {
            ScmBackend::Git(scm) => scm.has_remote(),
            ScmBackend::P4(scm) => scm.has_remote(),
        }
    }

    async fn remote_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        match self {
            ScmBackend::Git(scm) => scm.remote_changes().await,
            ScmBackend::P4(scm) => scm.remote_changes().await,
        }
    }

    async fn current_version(&self) -> Result<String, ScmError> {
        match self {
            ScmBackend::Git(scm) => scm.current_version().await,
            ScmBackend::P4(scm) => scm.current_version().await,
        }
    }

    async fn branch(&self) -> Result<String, ScmError> {
        match self {
            ScmBackend::Git(scm) => scm.branch().await,
            ScmBackend::P4(scm) => scm.branch().await,
        }
    }

    async fn history(
        &self,
        path: &Path,
        max_entries: usize,
    ) -> Result<Vec<HistoryEntry>, ScmError> {
        match self {
            ScmBackend::Git(scm) => scm.history(path, max_entries).await,
            ScmBackend::P4(scm) => scm.history(path, max_entries).await,
        }
    }

    async fn file(&self, path: &Path, version: Option<&str>) -> Result<Vec<String>, ScmError> {
        match self {
            ScmBackend::Git(scm) => scm.file(path, version).await,
            ScmBackend::P4(scm) => scm.file(path, version).await,
        }
    }

    async fn patch(&self, version: &str) -> Result<Vec<String>, ScmError> {
        match self {
            ScmBackend::Git(scm) => scm.patch(version).await,
            ScmBackend::P4(scm) => scm.patch(version).await,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ScmError {
    #[snafu(display("Failed to spawn '{} {}' in {}", program, args, root.best_effort_display()))]
    SpawnError {
        program: String,
        args: String,
        root: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("'{} {}' failed in {}: {}", program, args, root.best_effort_display(), stderr))]
    CommandFailed {
        program: String,
        args: String,
        root: PathBuf,
        stderr: String,
    },
    #[snafu(display("'{} {}' produced output that is not valid UTF-8", program, args))]
    DecodeError {
        program: String,
        args: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Unexpected '{}' output: {:?}", program, record))]
    MalformedOutput { program: String, record: String },
}
