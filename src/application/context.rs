use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::ResultExt;
use tracing::info;

use crate::application::RuntimeConfig;
use crate::application::application::{ApplicationError, RootSnafu, SettingsSnafu};
use crate::config::Settings;
use crate::ext::PathDisplayExt;
use crate::filesystem::SourceTree;
use crate::render::{MarkerSet, RenderOptions};
use crate::scm::{Scm, ScmBackend, ScmMount, discover_repositories};
use crate::updater::{SharedTree, UpdaterStatus, shared_tree};

/// Everything the front ends share, built once at start-up.
pub struct AppContext {
    pub root: PathBuf,
    pub settings: Settings,
    pub tree: SharedTree,
    pub status: Arc<UpdaterStatus>,
    pub backends: Vec<ScmBackend>,
    pub mounts: Vec<ScmMount>,
    pub render_options: RenderOptions,
}

impl AppContext {
    pub async fn build(config: &RuntimeConfig) -> Result<Self, ApplicationError> {
        let root = config.root.canonicalize().context(RootSnafu {
            root: config.root.clone(),
        })?;
        let settings = Settings::read(&root).await.context(SettingsSnafu)?;
        let filter = settings.source_tree.ignore_filter();

        let (backends, mounts): (Vec<_>, Vec<_>) =
            discover_repositories(&root, &settings.scm, &filter)
                .await
                .into_iter()
                .map(|discovered| (discovered.backend, discovered.mount))
                .unzip();
        info!(
            "Watching {} with {} repositories",
            root.best_effort_display(),
            backends.len()
        );

        let render_options = RenderOptions {
            order: settings.source_tree.display_order,
            hide_dot_files: settings.source_tree.hide_dot_files,
            markers: MarkerSet::select(settings.source_tree.use_unicode && !config.ascii),
        };

        Ok(Self {
            tree: shared_tree(SourceTree::new(&root, filter)),
            root,
            settings,
            status: Arc::new(UpdaterStatus::default()),
            backends,
            mounts,
            render_options,
        })
    }

    /// The SCM owning `path`: the deepest enclosing root, with the preferred
    /// engine winning when two roots coincide.
    pub fn backend_for(&self, path: &Path) -> Option<&ScmBackend> {
        let preferred = self.settings.scm.preferred_scm;
        self.backends
            .iter()
            .filter(|backend| path.starts_with(backend.root()))
            .max_by_key(|backend| {
                (
                    backend.root().components().count(),
                    Some(backend.kind()) == preferred,
                )
            })
    }
}
