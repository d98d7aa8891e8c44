//! Single consumer side of the pipeline: the update queue and the thread
//! that applies it to the shared tree.

mod command;
mod queue;
mod status;
mod tree_updater;

pub use command::UpdateCommand;
pub use queue::{UpdateQueue, UpdateReceiver, update_channel};
pub use status::UpdaterStatus;
pub use tree_updater::{
    SharedTree, TreeUpdater, TreeUpdaterHandle, UpdateError, UpdaterError, UpdaterState,
    lock_tree, shared_tree,
};
