use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Source tree annotated with live SCM status")]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// The root directory of the project
    #[clap(long, short, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Draw the tree with ASCII markers only
    #[clap(long, global = true)]
    pub ascii: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Poll every repository once, print the tree and exit
    Tree {
        /// Expand every directory, not only the ones with changes
        #[clap(long)]
        all: bool,
    },
    /// Keep the tree up to date and read `<key> [line]` commands from stdin
    Watch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_is_not_required() {
        let cli = Cli::try_parse_from(["scmtree"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.root, PathBuf::from("."));
        assert!(!cli.ascii);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["scmtree", "tree", "--all", "--ascii", "--root", "/src"])
            .unwrap();
        assert_eq!(cli.command, Some(Command::Tree { all: true }));
        assert!(cli.ascii);
        assert_eq!(cli.root, PathBuf::from("/src"));
    }

    #[test]
    fn unknown_log_levels_are_rejected() {
        assert!(Cli::try_parse_from(["scmtree", "--log-level", "loud"]).is_err());
    }
}
