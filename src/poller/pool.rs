use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread::available_parallelism;
use std::time::{Duration, Instant};

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use futures::FutureExt;
use futures_channel::oneshot;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::ext::PathDisplayExt;
use crate::poller::{ScmPoller, StopSignal};
use crate::scm::Scm;

const DEFAULT_WORKER_THREADS: usize = 1;

/// Worker threads running one poll loop per SCM root.
pub struct PollerPool {
    dispatcher: Dispatcher,
    stop: Option<oneshot::Sender<()>>,
    stop_signal: StopSignal,
    running: Vec<(PathBuf, oneshot::Receiver<()>)>,
}

impl PollerPool {
    pub fn new(poller_count: usize) -> Result<Self, PollerPoolError> {
        let workers_num = Self::determine_worker_count(poller_count);
        debug!("Using {} worker threads for SCM polling", workers_num);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(workers_num)
            .build()
            .context(DispatcherSnafu)?;
        let (stop, signal) = oneshot::channel();

        Ok(Self {
            dispatcher,
            stop: Some(stop),
            stop_signal: signal.shared(),
            running: Vec::new(),
        })
    }

    /// One worker per poll loop, capped by the available parallelism.
    fn determine_worker_count(poller_count: usize) -> NonZeroUsize {
        let available = available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(DEFAULT_WORKER_THREADS);
        NonZeroUsize::new(poller_count.min(available))
            .or(NonZeroUsize::new(DEFAULT_WORKER_THREADS))
            .unwrap_or(NonZeroUsize::MIN)
    }

    pub fn start<S>(&mut self, pollers: Vec<ScmPoller<S>>) -> Result<(), PollerPoolError>
    where
        S: Scm + Send + 'static,
    {
        for poller in pollers {
            let root = poller.root().to_path_buf();
            let stop = self.stop_signal.clone();
            let receiver = self
                .dispatcher
                .dispatch(move || poller.run(stop))
                .map_err(|e| PollerPoolError::DispatchError {
                    root: root.clone(),
                    error: e.to_string(),
                })?;

            info!("Started poller for {}", root.best_effort_display());
            self.running.push((root, receiver));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Signals every poll loop to stop and waits for them until `timeout`
    /// has elapsed overall. Returns how many loops had to be abandoned.
    pub async fn shutdown(mut self, timeout: Duration) -> usize {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        let deadline = Instant::now() + timeout;
        let mut abandoned = 0;
        for (root, receiver) in self.running.drain(..) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match compio::time::timeout(remaining, receiver).await {
                Ok(Ok(())) => debug!("Poller for {} stopped", root.best_effort_display()),
                Ok(Err(_)) => debug!("Poller for {} was canceled", root.best_effort_display()),
                Err(_) => {
                    warn!(
                        "Poller for {} did not stop within {:?}, abandoning it",
                        root.best_effort_display(),
                        timeout
                    );
                    abandoned += 1;
                }
            }
        }

        if abandoned == 0 {
            if let Err(err) = self.dispatcher.join().await {
                warn!("Failed to join poller threads: {}", err);
            }
        }
        abandoned
    }
}

#[derive(Debug, Snafu)]
pub enum PollerPoolError {
    #[snafu(display("Failed to create poller dispatcher"))]
    DispatcherError { source: std::io::Error },
    #[snafu(display("Failed to dispatch poller for {}: {}", root.best_effort_display(), error))]
    DispatchError { root: PathBuf, error: String },
}
