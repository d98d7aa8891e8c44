//! UI edge: key bindings and the tree actions they trigger.

mod action_table;
mod tree_action;

pub use action_table::{ActionParseError, ActionRequest, ActionTable, TreeAction};
pub use tree_action::{ActionOutcome, ScmRequest, apply_tree_action};
