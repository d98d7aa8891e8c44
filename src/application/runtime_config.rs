use std::path::PathBuf;

use crate::cli::{Cli, Command};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub root: PathBuf,
    pub command: Command,
    /// Overrides `use_unicode` from the settings file.
    pub ascii: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            root: cli.root,
            command: cli.command.unwrap_or(Command::Watch),
            ascii: cli.ascii,
        }
    }
}
