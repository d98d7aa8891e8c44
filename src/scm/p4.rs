use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use compio::process::Command;
use snafu::ResultExt;
use tracing::debug;

use crate::scm::{
    ChangeEvent, CommandFailedSnafu, DecodeSnafu, HistoryEntry, MalformedOutputSnafu, Scm,
    ScmError, ScmKind, ScmStatus, SpawnSnafu,
};

const P4: &str = "p4";
const TAG_PREFIX: &str = "... ";

/// Warnings p4 prints instead of an empty answer.
const EMPTY_ANSWERS: [&str; 4] = [
    "file(s) not opened",
    "file(s) up-to-date",
    "no such file(s)",
    "not in client view",
];

/// One `-ztag` record: field name to value, multi line values joined.
type TaggedRecord = HashMap<String, String>;

/// Perforce client workspace driven through the `p4` command line.
#[derive(Debug, Clone)]
pub struct P4Scm {
    root: PathBuf,
    remote_checks: bool,
}

impl P4Scm {
    pub fn new(root: impl Into<PathBuf>, remote_checks: bool) -> Self {
        Self {
            root: root.into(),
            remote_checks,
        }
    }

    /// Runs `p4 -ztag -d <root> <args>`.
    async fn run_tagged(&self, args: &[&str]) -> Result<Vec<TaggedRecord>, ScmError> {
        let mut full = vec!["-ztag"];
        full.extend_from_slice(args);
        let output = self.run_p4(&full).await?;
        parse_tagged(&output)
    }

    async fn run_p4(&self, args: &[&str]) -> Result<String, ScmError> {
        let joined = args.join(" ");
        let mut cmd = Command::new(P4);
        cmd.arg("-d").arg(&self.root).args(args);
        let _ = cmd.stdin(Stdio::null());
        let _ = cmd.stdout(Stdio::piped());
        let _ = cmd.stderr(Stdio::piped());

        let output = cmd.output().await.context(SpawnSnafu {
            program: P4,
            args: joined.clone(),
            root: self.root.clone(),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            if is_empty_answer(&stderr) {
                debug!("'p4 {}' in {}: {}", joined, self.root.display(), stderr);
                return Ok(String::new());
            }
            return CommandFailedSnafu {
                program: P4,
                args: joined,
                root: self.root.clone(),
                stderr,
            }
            .fail();
        }

        String::from_utf8(output.stdout).context(DecodeSnafu {
            program: P4,
            args: joined,
        })
    }

    /// `<root>/...`, every file of the workspace below the root.
    fn everything(&self) -> String {
        format!("{}/...", self.root.display())
    }
}

impl Scm for P4Scm {
    fn root(&self) -> &Path {
        &self.root
    }

    fn kind(&self) -> ScmKind {
        ScmKind::P4
    }

    async fn tree_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        let everything = self.everything();
        let records = self.run_tagged(&["fstat", "-Ro", &everything]).await?;
        opened_changes(&self.root, &records)
    }

    fn has_remote(&self) -> bool {
        self.remote_checks
    }

    async fn remote_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        let everything = self.everything();
        let records = self.run_tagged(&["sync", "-n", &everything]).await?;
        pending_syncs(&self.root, &records)
    }

    async fn current_version(&self) -> Result<String, ScmError> {
        let have = format!("{}#have", self.everything());
        let records = self
            .run_tagged(&["changes", "-m1", "-s", "submitted", &have])
            .await?;
        field(&records, "change").map(str::to_string)
    }

    async fn branch(&self) -> Result<String, ScmError> {
        let records = self.run_tagged(&["info"]).await?;
        workspace_name(&records).map(str::to_string)
    }

    async fn history(
        &self,
        path: &Path,
        max_entries: usize,
    ) -> Result<Vec<HistoryEntry>, ScmError> {
        let count = max_entries.to_string();
        let file = self.root.join(path);
        let file = file.to_string_lossy();
        let records = self
            .run_tagged(&["changes", "-l", "-s", "submitted", "-m", &count, &file])
            .await?;
        records.iter().map(history_entry).collect()
    }

    async fn file(&self, path: &Path, version: Option<&str>) -> Result<Vec<String>, ScmError> {
        let revision = match version {
            Some(change) => format!("{}@{}", self.root.join(path).display(), change),
            None => format!("{}#have", self.root.join(path).display()),
        };
        let output = self.run_p4(&["print", "-q", &revision]).await?;
        Ok(output.lines().map(str::to_string).collect())
    }

    async fn patch(&self, version: &str) -> Result<Vec<String>, ScmError> {
        let output = self.run_p4(&["describe", "-du", version]).await?;
        Ok(output.lines().map(str::to_string).collect())
    }
}

fn is_empty_answer(stderr: &str) -> bool {
    EMPTY_ANSWERS.iter().any(|answer| stderr.contains(answer))
}

/// Splits `-ztag` output into records. Lines that do not start a new field
/// continue the previous value, so a blank line only ends a record when a
/// field follows it.
fn parse_tagged(output: &str) -> Result<Vec<TaggedRecord>, ScmError> {
    let mut records = Vec::new();
    let mut current = TaggedRecord::new();
    let mut last_key: Option<String> = None;
    let mut after_blank = false;

    for line in output.lines() {
        if line.trim().is_empty() {
            after_blank = true;
        } else if let Some(tagged) = line.strip_prefix(TAG_PREFIX) {
            let (key, value) = tagged.split_once(' ').unwrap_or((tagged, ""));
            if key.is_empty() {
                return MalformedOutputSnafu {
                    program: P4,
                    record: line,
                }
                .fail();
            }
            if after_blank && !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            let _ = current.insert(key.to_string(), value.to_string());
            last_key = Some(key.to_string());
            after_blank = false;
        } else if let Some(value) = last_key.as_ref().and_then(|key| current.get_mut(key)) {
            value.push('\n');
            if after_blank {
                value.push('\n');
            }
            value.push_str(line);
            after_blank = false;
        } else {
            return MalformedOutputSnafu {
                program: P4,
                record: line,
            }
            .fail();
        }
    }
    if !current.is_empty() {
        records.push(current);
    }
    Ok(records)
}

fn field<'a>(records: &'a [TaggedRecord], key: &str) -> Result<&'a str, ScmError> {
    records
        .iter()
        .find_map(|record| record.get(key))
        .map(String::as_str)
        .ok_or_else(|| ScmError::MalformedOutput {
            program: P4.to_string(),
            record: format!("no '{key}' field"),
        })
}

/// The stream of the workspace, or the client name for classic depots.
fn workspace_name(info: &[TaggedRecord]) -> Result<&str, ScmError> {
    field(info, "clientStream").or_else(|_| field(info, "clientName"))
}

/// `clientFile` of a record as a path relative to `root`.
fn client_path<'a>(root: &Path, record: &'a TaggedRecord) -> Result<&'a Path, ScmError> {
    record
        .get("clientFile")
        .and_then(|file| Path::new(file).strip_prefix(root).ok())
        .ok_or_else(|| ScmError::MalformedOutput {
            program: P4.to_string(),
            record: format!("{record:?}"),
        })
}

fn opened_status(action: &str) -> ScmStatus {
    match action {
        "add" | "branch" | "move/add" | "import" => ScmStatus::Added,
        "delete" | "move/delete" | "purge" | "archive" => ScmStatus::Deleted,
        _ => ScmStatus::Modified,
    }
}

/// Files opened in the workspace, from `fstat -Ro`.
fn opened_changes(root: &Path, records: &[TaggedRecord]) -> Result<HashSet<ChangeEvent>, ScmError> {
    records
        .iter()
        .map(|record| {
            let path = client_path(root, record)?;
            let action = record.get("action").map(String::as_str).unwrap_or_default();
            Ok(ChangeEvent::new(root, ScmKind::P4, path, opened_status(action)))
        })
        .collect()
}

/// Files a `sync` would touch, from `sync -n`.
fn pending_syncs(root: &Path, records: &[TaggedRecord]) -> Result<HashSet<ChangeEvent>, ScmError> {
    records
        .iter()
        .map(|record| {
            let path = client_path(root, record)?;
            Ok(ChangeEvent::new(root, ScmKind::P4, path, ScmStatus::OutOfDate))
        })
        .collect()
}

fn history_entry(record: &TaggedRecord) -> Result<HistoryEntry, ScmError> {
    let malformed = || ScmError::MalformedOutput {
        program: P4.to_string(),
        record: format!("{record:?}"),
    };
    let version = record.get("change").ok_or_else(malformed)?;
    let timestamp = record
        .get("time")
        .and_then(|time| time.trim().parse::<i64>().ok())
        .ok_or_else(malformed)?;

    Ok(HistoryEntry {
        version: version.clone(),
        author: record.get("user").cloned().unwrap_or_default(),
        timestamp,
        summary: record.get("desc").map(|desc| desc.trim().to_string()).unwrap_or_default(),
    })
}
