use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use derive_more::Display;
use time::OffsetDateTime;

/// Source control engines the tree knows how to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum ScmKind {
    #[display("Git")]
    Git,
    #[display("P4")]
    P4,
}

impl ScmKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "git" => Some(ScmKind::Git),
            "p4" | "perforce" => Some(ScmKind::P4),
            _ => None,
        }
    }

    /// Single letter used to tag per-engine statuses and SCM mounts in the rendered tree.
    pub fn initial(self) -> char {
        match self {
            ScmKind::Git => 'G',
            ScmKind::P4 => 'P',
        }
    }
}

/// Path level status as reported by an SCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum ScmStatus {
    #[display("added")]
    Added,
    #[display("modified")]
    Modified,
    #[display("deleted")]
    Deleted,
    #[display("unknown")]
    Unknown,
    /// Changed upstream but not in the working copy.
    #[display("out of date")]
    OutOfDate,
    #[display("cleared")]
    Cleared,
}

impl ScmStatus {
    /// Everything except `Cleared` counts towards ancestor flags.
    pub fn is_live(self) -> bool {
        !matches!(self, ScmStatus::Cleared)
    }
}

/// One reported status for one path under one SCM root.
///
/// Equality and hashing only look at `(root, path)`, so a change list holds at
/// most one event per path and set differences line up paths across polls.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    root: PathBuf,
    kind: ScmKind,
    path: PathBuf,
    status: ScmStatus,
    directory: bool,
}

impl ChangeEvent {
    pub fn new(
        root: impl Into<PathBuf>,
        kind: ScmKind,
        path: impl Into<PathBuf>,
        status: ScmStatus,
    ) -> Self {
        Self {
            root: root.into(),
            kind,
            path: path.into(),
            status,
            directory: false,
        }
    }

    /// Marks the path as a directory, as git does for untracked nested repositories.
    pub fn into_directory(self) -> Self {
        Self {
            directory: true,
            ..self
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind(&self) -> ScmKind {
        self.kind
    }

    /// Path relative to [`ChangeEvent::root`].
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> ScmStatus {
        self.status
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }
}

impl PartialEq for ChangeEvent {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.path == other.path
    }
}

impl Eq for ChangeEvent {}

impl Hash for ChangeEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
        self.path.hash(state);
    }
}

/// A single revision in the history of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub version: String,
    pub author: String,
    /// Seconds since the unix epoch.
    pub timestamp: i64,
    pub summary: String,
}

const SHORT_VERSION_LEN: usize = 8;
const HEADLINE_LEN: usize = 50;

impl HistoryEntry {
    /// Entry shown in place of a history that could not be produced.
    pub fn placeholder(message: impl Into<String>) -> Self {
        Self {
            version: "none".to_string(),
            author: String::new(),
            timestamp: 0,
            summary: message.into(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.version == "none"
    }

    pub fn short_version(&self) -> &str {
        match self.version.char_indices().nth(SHORT_VERSION_LEN) {
            Some((idx, _)) => &self.version[..idx],
            None => &self.version,
        }
    }

    /// `YYYYMMDD` in UTC.
    pub fn date_stamp(&self) -> String {
        match OffsetDateTime::from_unix_timestamp(self.timestamp) {
            Ok(moment) => {
                let date = moment.date();
                format!(
                    "{:04}{:02}{:02}",
                    date.year(),
                    u8::from(date.month()),
                    date.day()
                )
            }
            Err(_) => "00000000".to_string(),
        }
    }

    /// First line of the summary, cut to a fixed width.
    pub fn headline(&self) -> &str {
        let first = self.summary.lines().next().unwrap_or_default();
        match first.char_indices().nth(HEADLINE_LEN) {
            Some((idx, _)) => &first[..idx],
            None => first,
        }
    }
}

/// Identity of an SCM root, attached to the tree node the root maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmMount {
    pub root: PathBuf,
    pub kind: ScmKind,
    /// Nested inside another repository (submodule or nested checkout).
    pub submodule: bool,
    pub branch: Option<String>,
}

impl ScmMount {
    /// Tag rendered after the node name, lower case for submodules.
    pub fn tag(&self) -> char {
        let initial = self.kind.initial();
        if self.submodule {
            initial.to_ascii_lowercase()
        } else {
            initial
        }
    }
}
