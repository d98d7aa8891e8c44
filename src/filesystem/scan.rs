use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};
use tracing::debug;

use crate::ext::PathDisplayExt;
use crate::filesystem::{EntryKind, IgnoreFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Relative to the scanned root.
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Point in time listing of everything below a directory.
#[derive(Debug, Clone)]
pub struct FilesystemScan {
    root: PathBuf,
    entries: Vec<ScanEntry>,
    skipped: usize,
}

impl FilesystemScan {
    /// Walks `root` recursively. Filtered names are left out, unreadable
    /// entries are counted in [`FilesystemScan::skipped`] and symlinks are
    /// listed as files without being followed.
    pub fn collect(root: &Path, filter: &IgnoreFilter) -> Self {
        let mut entries = Vec::new();
        let mut skipped = 0;

        let entry_filter = filter.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| entry.depth() == 0 || !is_ignored(&entry_filter, entry))
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping below {}: {}", root.best_effort_display(), err);
                    skipped += 1;
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                skipped += 1;
                continue;
            };
            entries.push(ScanEntry {
                path: relative.to_path_buf(),
                kind: entry_kind(&entry),
            });
        }

        debug!(
            "Scanned {} entries below {} ({} skipped)",
            entries.len(),
            root.best_effort_display(),
            skipped
        );

        Self {
            root: root.to_path_buf(),
            entries,
            skipped,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[ScanEntry] {
        &self.entries
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn entry_kind(entry: &DirEntry) -> EntryKind {
    if entry.file_type().is_some_and(|file_type| file_type.is_dir()) {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

fn is_ignored(filter: &IgnoreFilter, entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    match entry_kind(entry) {
        EntryKind::Directory => filter.is_directory_filtered(&name),
        EntryKind::File => filter.is_suffix_filtered(&name) || filter.is_directory_filtered(&name),
    }
}
