use std::collections::HashMap;

use derive_more::Display;
use snafu::{OptionExt, ResultExt, Snafu};

/// Everything a key press on the tree can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TreeAction {
    #[display("select")]
    Select,
    #[display("close item")]
    CloseItem,
    #[display("close parents")]
    CloseParents,
    #[display("history")]
    History,
    #[display("patch")]
    Patch,
    #[display("open version")]
    OpenVersion,
    #[display("rescan")]
    Rescan,
    #[display("quit")]
    Quit,
}

const KEY_BINDINGS: [(&str, TreeAction, &str); 9] = [
    ("enter", TreeAction::Select, "Toggle a directory or a file history"),
    ("s", TreeAction::Select, "Toggle a directory or a file history"),
    ("x", TreeAction::CloseItem, "Close the item or its parent"),
    ("X", TreeAction::CloseParents, "Close all the parents of the item"),
    ("h", TreeAction::History, "Show the history of a file"),
    ("p", TreeAction::Patch, "Show the patch of a history item"),
    ("o", TreeAction::OpenVersion, "Print the file at a historical version"),
    ("r", TreeAction::Rescan, "Rescan the file system"),
    ("q", TreeAction::Quit, "Quit"),
];

/// A parsed `<key> [line]` command. An empty input is the enter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: TreeAction,
    pub line: Option<usize>,
}

/// Key to action lookup, built once at start-up.
#[derive(Debug, Clone)]
pub struct ActionTable {
    bindings: HashMap<&'static str, TreeAction>,
}

impl Default for ActionTable {
    fn default() -> Self {
        Self {
            bindings: KEY_BINDINGS
                .iter()
                .map(|(key, action, _)| (*key, *action))
                .collect(),
        }
    }
}

impl ActionTable {
    pub fn action_for(&self, key: &str) -> Option<TreeAction> {
        self.bindings.get(key).copied()
    }

    pub fn parse(&self, input: &str) -> Result<ActionRequest, ActionParseError> {
        let mut words = input.split_whitespace();
        let key = words.next().unwrap_or("enter");
        let action = self.action_for(key).context(UnknownKeySnafu { key })?;

        let line = match words.next() {
            Some(word) => Some(word.parse().context(InvalidLineSnafu { word })?),
            None => None,
        };
        if let Some(extra) = words.next() {
            return TrailingInputSnafu { extra }.fail();
        }

        Ok(ActionRequest { action, line })
    }

    /// One `key  description` line per binding, in binding order.
    pub fn help(&self) -> Vec<String> {
        KEY_BINDINGS
            .iter()
            .map(|(key, _, description)| format!("{key:<6}{description}"))
            .collect()
    }
}

#[derive(Debug, Snafu)]
pub enum ActionParseError {
    #[snafu(display("Unknown key '{}'", key))]
    UnknownKey { key: String },
    #[snafu(display("'{}' is not a line number", word))]
    InvalidLine {
        word: String,
        source: std::num::ParseIntError,
    },
    #[snafu(display("Unexpected input after the line number: '{}'", extra))]
    TrailingInput { extra: String },
}
