use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use compio::process::Command;
use snafu::ResultExt;
use tracing::debug;

use crate::scm::{
    ChangeEvent, CommandFailedSnafu, DecodeSnafu, HistoryEntry, MalformedOutputSnafu, Scm,
    ScmError, ScmKind, ScmStatus, SpawnSnafu,
};

const GIT: &str = "git";
const FIELD_SEPARATOR: char = '\u{1f}';
const RECORD_SEPARATOR: char = '\u{1e}';
const HISTORY_FORMAT: &str = "--format=%H%x1f%an%x1f%at%x1f%s%x1e";

/// Git working copy driven through the `git` command line.
#[derive(Debug, Clone)]
pub struct GitScm {
    root: PathBuf,
    remote_checks: bool,
}

impl GitScm {
    pub fn new(root: impl Into<PathBuf>, remote_checks: bool) -> Self {
        Self {
            root: root.into(),
            remote_checks,
        }
    }

    async fn run_git(&self, args: &[&str]) -> Result<String, ScmError> {
        let joined = args.join(" ");
        let mut cmd = Command::new(GIT);
        cmd.arg("-C").arg(&self.root).args(args);
        let _ = cmd.stdin(Stdio::null());
        let _ = cmd.stdout(Stdio::piped());
        let _ = cmd.stderr(Stdio::piped());

        let output = cmd.output().await.context(SpawnSnafu {
            program: GIT,
            args: joined.clone(),
            root: self.root.clone(),
        })?;

        if !output.status.success() {
            return CommandFailedSnafu {
                program: GIT,
                args: joined,
                root: self.root.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .fail();
        }

        String::from_utf8(output.stdout).context(DecodeSnafu {
            program: GIT,
            args: joined,
        })
    }

    async fn has_remotes(&self) -> Result<bool, ScmError> {
        let remotes = self.run_git(&["remote"]).await?;
        Ok(remotes.lines().any(|line| !line.trim().is_empty()))
    }
}

impl Scm for GitScm {
    fn root(&self) -> &Path {
        &self.root
    }

    fn kind(&self) -> ScmKind {
        ScmKind::Git
    }

    async fn tree_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        let output = self
            .run_git(&["status", "--porcelain=v1", "-z", "--untracked-files=all"])
            .await?;
        parse_porcelain_status(&self.root, &output)
    }

    fn has_remote(&self) -> bool {
        self.remote_checks
    }

    async fn remote_changes(&self) -> Result<HashSet<ChangeEvent>, ScmError> {
        if !self.has_remotes().await? {
            return Ok(HashSet::new());
        }
        self.run_git(&["fetch", "--quiet"]).await?;

        let output = match self
            .run_git(&["diff", "--name-only", "-z", "HEAD...@{upstream}"])
            .await
        {
            Ok(output) => output,
            Err(ScmError::CommandFailed { stderr, .. }) => {
                debug!(
                    "No upstream to compare against in {}: {}",
                    self.root.display(),
                    stderr
                );
                return Ok(HashSet::new());
            }
            Err(err) => return Err(err),
        };

        Ok(output
            .split('\0')
            .filter(|name| !name.is_empty())
            .map(|name| ChangeEvent::new(&self.root, ScmKind::Git, name, ScmStatus::OutOfDate))
            .collect())
    }

    async fn current_version(&self) -> Result<String, ScmError> {
        Ok(self.run_git(&["rev-parse", "HEAD"]).await?.trim().to_string())
    }

    async fn branch(&self) -> Result<String, ScmError> {
        Ok(self
            .run_git(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await?
            .trim()
            .to_string())
    }

    async fn history(
        &self,
        path: &Path,
        max_entries: usize,
    ) -> Result<Vec<HistoryEntry>, ScmError> {
        let count = max_entries.to_string();
        let path = path.to_string_lossy();
        let output = self
            .run_git(&["log", "-n", &count, HISTORY_FORMAT, "--", &path])
            .await?;
        parse_history(&output)
    }

    async fn file(&self, path: &Path, version: Option<&str>) -> Result<Vec<String>, ScmError> {
        let object = format!("{}:{}", version.unwrap_or("HEAD"), path.to_string_lossy());
        let output = self.run_git(&["show", &object]).await?;
        Ok(output.lines().map(str::to_string).collect())
    }

    async fn patch(&self, version: &str) -> Result<Vec<String>, ScmError> {
        let output = self
            .run_git(&["show", "--format=medium", "--patch", version])
            .await?;
        Ok(output.lines().map(str::to_string).collect())
    }
}

/// Parses `git status --porcelain=v1 -z` output into change events.
fn parse_porcelain_status(root: &Path, output: &str) -> Result<HashSet<ChangeEvent>, ScmError> {
    let mut changes = HashSet::new();
    let mut records = output.split('\0').filter(|record| !record.is_empty());

    while let Some(record) = records.next() {
        let (Some(codes), Some(path)) = (record.get(..2), record.get(3..)) else {
            return MalformedOutputSnafu {
                program: GIT,
                record,
            }
            .fail();
        };
        let directory = path.ends_with('/');
        let path = path.trim_end_matches('/');
        let mut chars = codes.chars();
        let (x, y) = (chars.next().unwrap_or(' '), chars.next().unwrap_or(' '));

        let status = match (x, y) {
            ('!', '!') => continue,
            ('?', '?') => ScmStatus::Unknown,
            ('R' | 'C', _) => {
                // The -z format puts the origin path in the following record.
                let origin = records.next();
                if let (Some(origin), 'R') = (origin, x) {
                    changes.insert(ChangeEvent::new(
                        root,
                        ScmKind::Git,
                        origin,
                        ScmStatus::Deleted,
                    ));
                }
                ScmStatus::Added
            }
            _ if x == 'A' || y == 'A' => ScmStatus::Added,
            _ if x == 'D' || y == 'D' => ScmStatus::Deleted,
            _ => ScmStatus::Modified,
        };

        let event = ChangeEvent::new(root, ScmKind::Git, path, status);
        changes.insert(if directory {
            event.into_directory()
        } else {
            event
        });
    }

    Ok(changes)
}

fn parse_history(output: &str) -> Result<Vec<HistoryEntry>, ScmError> {
    output
        .split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .map(|record| {
            let mut fields = record.split(FIELD_SEPARATOR);
            let (Some(version), Some(author), Some(timestamp), summary) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return MalformedOutputSnafu {
                    program: GIT,
                    record,
                }
                .fail();
            };
            let timestamp = timestamp.trim().parse::<i64>().ok().ok_or_else(|| {
                ScmError::MalformedOutput {
                    program: GIT.to_string(),
                    record: record.to_string(),
                }
            })?;

            Ok(HistoryEntry {
                version: version.to_string(),
                author: author.to_string(),
                timestamp,
                summary: summary.unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn status_of(changes: &HashSet<ChangeEvent>, path: &str) -> Option<ScmStatus> {
        changes
            .get(&ChangeEvent::new("/repo", ScmKind::Git, path, ScmStatus::Cleared))
            .map(ChangeEvent::status)
    }

    #[rstest]
    #[case(" M src/main.rs\0", "src/main.rs", ScmStatus::Modified)]
    #[case("M  src/main.rs\0", "src/main.rs", ScmStatus::Modified)]
    #[case("MM src/main.rs\0", "src/main.rs", ScmStatus::Modified)]
    #[case("A  new.rs\0", "new.rs", ScmStatus::Added)]
    #[case("AM new.rs\0", "new.rs", ScmStatus::Added)]
    #[case(" D gone.rs\0", "gone.rs", ScmStatus::Deleted)]
    #[case("D  gone.rs\0", "gone.rs", ScmStatus::Deleted)]
    #[case("?? scratch/notes.txt\0", "scratch/notes.txt", ScmStatus::Unknown)]
    #[case("UU conflicted.rs\0", "conflicted.rs", ScmStatus::Modified)]
    fn porcelain_status_classes(
        #[case] output: &str,
        #[case] path: &str,
        #[case] expected: ScmStatus,
    ) {
        let changes = parse_porcelain_status(Path::new("/repo"), output).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(status_of(&changes, path), Some(expected));
    }

    #[test]
    fn porcelain_rename_reports_both_paths() {
        let output = "R  new_name.rs\0old_name.rs\0 M other.rs\0";
        let changes = parse_porcelain_status(Path::new("/repo"), output).unwrap();

        assert_eq!(changes.len(), 3);
        assert_eq!(status_of(&changes, "new_name.rs"), Some(ScmStatus::Added));
        assert_eq!(status_of(&changes, "old_name.rs"), Some(ScmStatus::Deleted));
        assert_eq!(status_of(&changes, "other.rs"), Some(ScmStatus::Modified));
    }

    #[test]
    fn porcelain_copy_keeps_origin() {
        let output = "C  copy.rs\0original.rs\0";
        let changes = parse_porcelain_status(Path::new("/repo"), output).unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(status_of(&changes, "copy.rs"), Some(ScmStatus::Added));
    }

    #[test]
    fn porcelain_keeps_the_directory_bit_of_nested_repositories() {
        let output = "?? newrepo/\0?? notes.txt\0";
        let changes = parse_porcelain_status(Path::new("/repo"), output).unwrap();

        let newrepo = changes
            .get(&ChangeEvent::new("/repo", ScmKind::Git, "newrepo", ScmStatus::Cleared))
            .unwrap();
        assert!(newrepo.is_directory());
        assert_eq!(newrepo.status(), ScmStatus::Unknown);

        let notes = changes
            .get(&ChangeEvent::new("/repo", ScmKind::Git, "notes.txt", ScmStatus::Cleared))
            .unwrap();
        assert!(!notes.is_directory());
    }

    #[test]
    fn porcelain_skips_ignored_entries() {
        let output = "!! target/\0 M src/lib.rs\0";
        let changes = parse_porcelain_status(Path::new("/repo"), output).unwrap();
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn porcelain_rejects_truncated_records() {
        let result = parse_porcelain_status(Path::new("/repo"), "M\0");
        assert!(matches!(result, Err(ScmError::MalformedOutput { .. })));
    }

    #[test]
    fn empty_status_is_no_changes() {
        let changes = parse_porcelain_status(Path::new("/repo"), "").unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn history_records_are_split_on_separators() {
        let output = "abc123\u{1f}Ann\u{1f}1540339200\u{1f}First line\u{1e}\n\
                      def456\u{1f}Bob\u{1f}1540425600\u{1f}Second\u{1e}\n";
        let history = parse_history(output).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, "abc123");
        assert_eq!(history[0].author, "Ann");
        assert_eq!(history[0].summary, "First line");
        assert_eq!(history[1].timestamp, 1_540_425_600);
    }

    #[test]
    fn history_with_bad_timestamp_is_malformed() {
        let output = "abc123\u{1f}Ann\u{1f}yesterday\u{1f}Oops\u{1e}";
        assert!(matches!(
            parse_history(output),
            Err(ScmError::MalformedOutput { .. })
        ));
    }
}
