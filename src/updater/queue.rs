use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::updater::UpdateCommand;

pub type UpdateReceiver = UnboundedReceiver<UpdateCommand>;

/// Producer side of the update queue. Cheap to clone, one per poller.
#[derive(Debug, Clone)]
pub struct UpdateQueue {
    sender: UnboundedSender<UpdateCommand>,
}

pub fn update_channel() -> (UpdateQueue, UpdateReceiver) {
    let (sender, receiver) = mpsc::unbounded();
    (UpdateQueue { sender }, receiver)
}

impl UpdateQueue {
    /// Never blocks. Returns `false` when the consumer is gone and the
    /// command was dropped.
    pub fn push(&self, command: UpdateCommand) -> bool {
        match self.sender.unbounded_send(command) {
            Ok(()) => true,
            Err(err) => {
                debug!("Update queue is closed, dropping {:?}", err.into_inner());
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
