//! Source control abstraction, the Git and Perforce backends and repository discovery.

mod backend;
mod change_event;
mod discovery;
mod git;
mod p4;
#[cfg(test)]
pub mod scripted;

pub use backend::{
    CommandFailedSnafu, DecodeSnafu, MalformedOutputSnafu, Scm, ScmBackend, ScmError, SpawnSnafu,
};
pub use change_event::{ChangeEvent, HistoryEntry, ScmKind, ScmMount, ScmStatus};
pub use discovery::{DiscoveredScm, discover_repositories};
pub use git::GitScm;
pub use p4::P4Scm;
