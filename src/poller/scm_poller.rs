use std::collections::HashSet;
use std::path::Path;
use std::pin::pin;
use std::time::{Duration, Instant};

use futures::future::{Either, Shared, select};
use futures_channel::oneshot;
use tracing::{debug, warn};

use crate::ext::PathDisplayExt;
use crate::poller::{ChangeDelta, PollDue, PollSchedule};
use crate::scm::{ChangeEvent, Scm};
use crate::updater::{UpdateCommand, UpdateQueue};

/// Resolves once every poll loop sharing it has to stop.
pub type StopSignal = Shared<oneshot::Receiver<()>>;

/// Periodically asks one SCM for its change list and turns the difference
/// against the previous answer into update commands.
pub struct ScmPoller<S> {
    scm: S,
    queue: UpdateQueue,
    previous: HashSet<ChangeEvent>,
    remote_cache: HashSet<ChangeEvent>,
    local_period: Duration,
    remote_period: Option<Duration>,
}

impl<S: Scm> ScmPoller<S> {
    pub fn new(
        scm: S,
        queue: UpdateQueue,
        local_period: Duration,
        remote_period: Option<Duration>,
    ) -> Self {
        Self {
            scm,
            queue,
            previous: HashSet::new(),
            remote_cache: HashSet::new(),
            local_period,
            remote_period,
        }
    }

    pub fn root(&self) -> &Path {
        self.scm.root()
    }

    /// The change list of the last successful poll.
    pub fn previous(&self) -> &HashSet<ChangeEvent> {
        &self.previous
    }

    /// One poll cycle. Returns `None` when the local check failed, in which
    /// case nothing is enqueued and the last good state is kept.
    pub async fn poll_once(&mut self, due: PollDue) -> Option<ChangeDelta> {
        let local = match self.scm.tree_changes().await {
            Ok(local) => local,
            Err(err) => {
                warn!(
                    "Skipping poll of {}: {}",
                    self.scm.root().best_effort_display(),
                    err
                );
                return None;
            }
        };

        if due.remote && self.scm.has_remote() {
            match self.scm.remote_changes().await {
                Ok(remote) => self.remote_cache = remote,
                Err(err) => warn!(
                    "Keeping cached remote changes of {}: {}",
                    self.scm.root().best_effort_display(),
                    err
                ),
            }
        }

        let mut current = local;
        for event in &self.remote_cache {
            if !current.contains(event) {
                current.insert(event.clone());
            }
        }

        let delta = ChangeDelta::between(&self.previous, &current);
        if !delta.is_empty() {
            debug!(
                "Poll of {}: {} reported, {} cleared",
                self.scm.root().best_effort_display(),
                delta.reported.len(),
                delta.cleared.len()
            );
        }

        for event in &delta.reported {
            self.queue.push(UpdateCommand::ApplyChange(event.clone()));
        }
        for event in &delta.cleared {
            self.queue.push(UpdateCommand::ClearChange(event.clone()));
        }

        self.previous = current;
        Some(delta)
    }

    /// Polls both tracks right away, then whichever track is due until `stop`
    /// resolves or the update queue closes.
    pub async fn run(mut self, stop: StopSignal) {
        let remote_period = self.remote_period.filter(|_| self.scm.has_remote());
        let mut schedule = PollSchedule::new(Instant::now(), self.local_period, remote_period);
        debug!(
            "Polling {} every {:?} (remote {:?})",
            self.scm.root().best_effort_display(),
            self.local_period,
            remote_period
        );

        loop {
            let due = schedule.take_due(Instant::now());
            if due.any() {
                self.poll_once(due).await;
            }
            if self.queue.is_closed() {
                debug!(
                    "Update queue closed, stopping poller of {}",
                    self.scm.root().best_effort_display()
                );
                break;
            }

            let wait = schedule
                .next_wake()
                .saturating_duration_since(Instant::now());
            let sleep = pin!(compio::time::sleep(wait));
            if let Either::Right(_) = select(sleep, stop.clone()).await {
                debug!(
                    "Stopping poller of {} with {} known changes",
                    self.scm.root().best_effort_display(),
                    self.previous().len()
                );
                break;
            }
        }
    }
}
