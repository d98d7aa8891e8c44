use std::path::PathBuf;

use snafu::Snafu;
use tracing::debug;

use crate::application::{AppContext, RuntimeConfig, front_end};
use crate::cli::Command;
use crate::config::SettingsCreationError;
use crate::ext::PathDisplayExt;
use crate::poller::PollerPoolError;
use crate::updater::UpdaterError;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let context = AppContext::build(&app_config).await?;
        debug!("Loaded settings: {:?}", context.settings);

        match app_config.command {
            Command::Tree { all } => front_end::print_tree(&context, all).await,
            Command::Watch => front_end::watch(context).await,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum ApplicationError {
    #[snafu(display("Cannot use {} as the project root", root.best_effort_display()))]
    RootError {
        root: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Critical failure encountered while reading the settings"))]
    SettingsError { source: SettingsCreationError },
    #[snafu(display("Critical failure encountered while starting the pollers"))]
    PollerPoolError { source: PollerPoolError },
    #[snafu(display("Critical failure encountered while starting the tree updater"))]
    UpdaterSpawnError { source: UpdaterError },
}
