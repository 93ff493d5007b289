//! Background poll cycle for the room directory.
//!
//! ## Design
//! - One spawned task per active view, driven by `tokio::time::interval`
//!   (first tick fires immediately, so activation polls at once).
//! - The [`Directory`] state machine is shared between the task and the
//!   owning [`PollerHandle`] behind a `std::sync::Mutex` that is never held
//!   across an `.await`. Its `Polling` phase is the in-progress flag: ticks
//!   and refreshes that arrive while a fetch is in flight are dropped.
//! - Readers get [`DirectoryState`] snapshots through a `watch` channel.
//! - Dropping the handle deactivates the directory and aborts the task; a
//!   fetch that resolves after that point is discarded by the state machine.
//!
//! ```rust,ignore
//! let handle = DirectoryPoller::new(RegistryClient::builder(settings).build()).spawn();
//! let mut rx = handle.subscribe();
//! while rx.changed().await.is_ok() {
//!     render(&rx.borrow());
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::directory::{Directory, DirectoryState, PollPhase};
use crate::registry::RoomRegistry;

/// Default refresh cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive failures after which cycle errors are logged at `error`.
const FAILURE_ESCALATION: u32 = 5;

/// Configuration for [`DirectoryPoller`].
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between scheduled cycles.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Owns the repeating fetch cycle against a [`RoomRegistry`].
pub struct DirectoryPoller<R> {
    registry: R,
    config: PollerConfig,
}

impl<R: RoomRegistry> DirectoryPoller<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            config: PollerConfig::default(),
        }
    }

    /// Override the poll interval (default 5 s).
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Activate: spawn the poll task on the current tokio runtime.
    ///
    /// The returned handle must be kept alive for as long as the directory is
    /// displayed; dropping it cancels polling.
    pub fn spawn(self) -> PollerHandle {
        let directory = Arc::new(Mutex::new(Directory::new()));
        let (state_tx, state_rx) = watch::channel(DirectoryState::default());
        // Capacity 1: at most one refresh is ever pending.
        let (refresh_tx, refresh_rx) = mpsc::channel(1);

        let task = PollTask {
            registry: self.registry,
            config: self.config,
            directory: Arc::clone(&directory),
            state_tx,
        };
        let join = tokio::spawn(task.run(refresh_rx));

        PollerHandle {
            directory,
            state_rx,
            refresh_tx,
            task: Some(join),
        }
    }
}

struct PollTask<R> {
    registry: R,
    config: PollerConfig,
    directory: Arc<Mutex<Directory>>,
    state_tx: watch::Sender<DirectoryState>,
}

impl<R: RoomRegistry> PollTask<R> {
    async fn run(self, mut refresh_rx: mpsc::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                cmd = refresh_rx.recv() => {
                    if cmd.is_none() {
                        // Handle dropped.
                        break;
                    }
                }
            }

            if !self.cycle(&mut refresh_rx, &mut consecutive_failures).await {
                break;
            }
            // Ticks that fell due during the fetch are dropped, not replayed.
            ticker.reset();
        }
        debug!("directory poller stopped");
    }

    /// One `Polling → Ready|Failed` cycle. Returns `false` once deactivated.
    async fn cycle(
        &self,
        refresh_rx: &mut mpsc::Receiver<()>,
        consecutive_failures: &mut u32,
    ) -> bool {
        {
            let mut dir = lock(&self.directory);
            if !dir.begin_poll() {
                return !dir.is_deactivated();
            }
            self.state_tx.send_replace(dir.state().clone());
        }
        // A refresh queued before the cycle started is satisfied by it.
        while refresh_rx.try_recv().is_ok() {}

        let result = self.registry.list_active_rooms().await;

        match &result {
            Ok(rooms) => {
                *consecutive_failures = 0;
                debug!(rooms = rooms.len(), "directory refreshed");
            }
            Err(e) => {
                *consecutive_failures = consecutive_failures.saturating_add(1);
                if *consecutive_failures >= FAILURE_ESCALATION {
                    error!(
                        error = %e,
                        consecutive_failures = *consecutive_failures,
                        "room listing failed repeatedly, keeping last known rooms"
                    );
                } else {
                    warn!(error = %e, "room listing failed, keeping last known rooms");
                }
            }
        }

        let mut dir = lock(&self.directory);
        if dir.complete(result) {
            self.state_tx.send_replace(dir.state().clone());
            true
        } else {
            debug!("discarding poll result for deactivated directory");
            !dir.is_deactivated()
        }
    }
}

/// Owned handle to a running poller. Dropping it deactivates the directory.
pub struct PollerHandle {
    directory: Arc<Mutex<Directory>>,
    state_rx: watch::Receiver<DirectoryState>,
    refresh_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Latest published snapshot.
    pub fn state(&self) -> DirectoryState {
        self.state_rx.borrow().clone()
    }

    /// A receiver notified on every published transition.
    pub fn subscribe(&self) -> watch::Receiver<DirectoryState> {
        self.state_rx.clone()
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.directory).is_polling()
    }

    /// Request an immediate cycle.
    ///
    /// Returns `false` when the request was dropped: a fetch is already in
    /// flight, a refresh is already pending, or the poller is shut down.
    pub fn refresh(&self) -> bool {
        {
            let dir = lock(&self.directory);
            if dir.is_deactivated() {
                return false;
            }
            if dir.is_polling() {
                debug!("refresh dropped, poll already in flight");
                return false;
            }
        }
        match self.refresh_tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("refresh dropped, one already pending");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }

    /// Wait until a cycle has finished (`Ready` or `Failed`) and return that
    /// snapshot. Returns `None` if the poller stopped first.
    pub async fn settled(&self) -> Option<DirectoryState> {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|s| matches!(s.phase, PollPhase::Ready | PollPhase::Failed))
            .await
            .ok()?;
        Some(state.clone())
    }

    /// Deactivate and stop the poll task.
    pub fn shutdown(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        lock(&self.directory).deactivate();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(directory: &Mutex<Directory>) -> MutexGuard<'_, Directory> {
    directory.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
