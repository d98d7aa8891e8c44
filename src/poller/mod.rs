//! Producer side of the pipeline: one poll loop per SCM root, turning change
//! list differences into update commands.

mod change_delta;
mod pool;
mod schedule;
mod scm_poller;

pub use change_delta::ChangeDelta;
pub use pool::{PollerPool, PollerPoolError};
pub use schedule::{PollDue, PollSchedule};
pub use scm_poller::{ScmPoller, StopSignal};
