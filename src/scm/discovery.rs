use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::config::ScmSettings;
use crate::ext::PathDisplayExt;
use crate::filesystem::IgnoreFilter;
use crate::scm::{GitScm, P4Scm, Scm, ScmBackend, ScmKind, ScmMount};

const GIT_MARKER: &str = ".git";
const P4_MARKER: &str = ".p4config";

/// Entry whose presence makes a directory the root of a working copy.
const MARKERS: [(ScmKind, &str); 2] = [(ScmKind::Git, GIT_MARKER), (ScmKind::P4, P4_MARKER)];

/// A working copy root found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRoot {
    pub path: PathBuf,
    pub kind: ScmKind,
    pub submodule: bool,
}

/// An SCM ready to be polled, with the metadata to attach to its tree node.
#[derive(Debug, Clone)]
pub struct DiscoveredScm {
    pub backend: ScmBackend,
    pub mount: ScmMount,
}

/// Finds the working copies enclosing `root` (which may lie above it) and
/// every one nested below it. Roots nested inside another root of the same
/// engine are marked as submodules.
pub fn find_repository_roots(root: &Path, filter: &IgnoreFilter) -> Vec<RepositoryRoot> {
    let mut found: Vec<(PathBuf, ScmKind)> = Vec::new();

    for (kind, marker) in MARKERS {
        if let Some(enclosing) = root.ancestors().find(|dir| dir.join(marker).exists()) {
            found.push((enclosing.to_path_buf(), kind));
        }
    }

    let dir_filter = filter.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            entry.file_type().is_some_and(|file_type| file_type.is_dir())
                && name != GIT_MARKER
                && !dir_filter.is_directory_filtered(&name)
        })
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping during repository search: {}", err);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        for (kind, marker) in MARKERS {
            let candidate = (entry.path().to_path_buf(), kind);
            if candidate.0.join(marker).exists() && !found.contains(&candidate) {
                found.push(candidate);
            }
        }
    }

    found.sort();
    found
        .iter()
        .map(|(path, kind)| RepositoryRoot {
            path: path.clone(),
            kind: *kind,
            submodule: found.iter().any(|(other, other_kind)| {
                other_kind == kind && other != path && path.starts_with(other)
            }),
        })
        .collect()
}

/// Creates a backend for every enabled repository around `root`.
pub async fn discover_repositories(
    root: &Path,
    settings: &ScmSettings,
    filter: &IgnoreFilter,
) -> Vec<DiscoveredScm> {
    let mut discovered = Vec::new();

    for repository in find_repository_roots(root, filter) {
        if !settings.is_enabled(repository.kind) {
            debug!(
                "{} repository at {} is not enabled",
                repository.kind,
                repository.path.best_effort_display()
            );
            continue;
        }

        let backend = match repository.kind {
            ScmKind::Git => ScmBackend::Git(GitScm::new(
                &repository.path,
                settings.remote_poll_period.is_some(),
            )),
            ScmKind::P4 => ScmBackend::P4(P4Scm::new(
                &repository.path,
                settings.remote_poll_period.is_some(),
            )),
        };

        let branch = match backend.branch().await {
            Ok(branch) => Some(branch),
            Err(err) => {
                warn!(
                    "Could not read the branch of {}: {}",
                    repository.path.best_effort_display(),
                    err
                );
                None
            }
        };

        info!(
            "Found {} {} at {}",
            repository.kind,
            if repository.submodule {
                "submodule"
            } else {
                "repository"
            },
            repository.path.best_effort_display()
        );

        discovered.push(DiscoveredScm {
            backend,
            mount: ScmMount {
                root: repository.path,
                kind: repository.kind,
                submodule: repository.submodule,
                branch,
            },
        });
    }

    discovered
}
