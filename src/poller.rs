use crate::error::Error;
use crate::mutator::{ConfigMutator, MutationOutcome};
use crate::status::{ScheduleStatus, StatusResolver, StatusSnapshot, TransitionEvent};
use crate::store::ConfigStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Requests sent from the presentation side to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Enable,
    Disable,
    Shutdown,
}

/// Everything the worker pushes to the presentation side, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Snapshot(StatusSnapshot),
    Transition(TransitionEvent),
    /// A user toggle was handled; the recorded status now assumes `target`.
    IntentApplied { target: ScheduleStatus },
    IntentFailed {
        target: ScheduleStatus,
        message: String,
    },
}

/// Owns the authoritative last-known status. Only the worker touches it;
/// observers see immutable snapshots through `dispatch`.
pub struct StatusPoller<D> {
    store: Arc<dyn ConfigStore>,
    resolver: StatusResolver,
    mutator: ConfigMutator,
    interval: Duration,
    last_status: ScheduleStatus,
    dispatch: D,
}

impl<D> StatusPoller<D>
where
    D: Fn(StatusUpdate) + Send + 'static,
{
    pub fn new(
        store: Arc<dyn ConfigStore>,
        resolver: StatusResolver,
        mutator: ConfigMutator,
        interval: Duration,
        dispatch: D,
    ) -> Result<Self, Error> {
        if interval.is_zero() {
            return Err(Error::InvalidSettings {
                reason: "poll interval must be greater than 0".to_string(),
            });
        }

        let last_status = resolver.resolve_store(store.as_ref());
        info!(status = %last_status, "initial schedule status");
        Ok(Self {
            store,
            resolver,
            mutator,
            interval,
            last_status,
            dispatch,
        })
    }

    pub fn status(&self) -> ScheduleStatus {
        self.last_status
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::new(self.last_status)
    }

    /// One poll: re-resolve, publish a fresh snapshot, and publish a
    /// transition only for a confident change.
    pub fn tick(&mut self) -> Option<TransitionEvent> {
        let status = self.resolver.resolve_store(self.store.as_ref());
        let previous = std::mem::replace(&mut self.last_status, status);
        (self.dispatch)(StatusUpdate::Snapshot(StatusSnapshot::new(status)));

        let transition = TransitionEvent::between(previous, status);
        match transition {
            Some(event) => {
                info!(from = %event.from, to = %event.to, "schedule status changed");
                (self.dispatch)(StatusUpdate::Transition(event));
            }
            None if previous != status => {
                debug!(from = %previous, to = %status, "status changed through unknown, no popup");
            }
            None => {}
        }
        transition
    }

    /// Applies a user toggle, then assumes it worked until the next tick says
    /// otherwise.
    pub async fn handle_intent(&mut self, enable: bool) -> Result<MutationOutcome, Error> {
        let target = ScheduleStatus::from_intent(enable);
        let result = self.mutator.set_enabled(enable).await;

        self.last_status = target;
        (self.dispatch)(StatusUpdate::Snapshot(StatusSnapshot::new(target)));
        (self.dispatch)(StatusUpdate::IntentApplied { target });

        if let Err(err) = &result {
            warn!(error = %err, %target, "schedule change failed");
            (self.dispatch)(StatusUpdate::IntentFailed {
                target,
                message: err.to_string(),
            });
        }
        result
    }

    /// Polls on the configured interval until `Shutdown` arrives or every
    /// command sender is gone. The first tick fires one interval after start.
    pub async fn run(mut self, mut command_rx: UnboundedReceiver<ControlCommand>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                command = command_rx.recv() => match command {
                    Some(ControlCommand::Enable) => {
                        let _ = self.handle_intent(true).await;
                    }
                    Some(ControlCommand::Disable) => {
                        let _ = self.handle_intent(false).await;
                    }
                    Some(ControlCommand::Shutdown) | None => break,
                },
            }
        }
        debug!("status poller stopped");
    }
}

pub struct PollerThread {
    commands: UnboundedSender<ControlCommand>,
    handle: std::thread::JoinHandle<()>,
}

impl PollerThread {
    pub fn commands(&self) -> UnboundedSender<ControlCommand> {
        self.commands.clone()
    }

    pub fn shutdown(self) {
        let _ = self.commands.send(ControlCommand::Shutdown);
        if self.handle.join().is_err() {
            error!("status poller thread panicked");
        }
    }
}

/// Moves the poller onto its own thread with a single-threaded runtime, so the
/// caller's event loop never waits on file or process I/O.
pub fn spawn_poller_thread<D>(poller: StatusPoller<D>) -> std::io::Result<PollerThread>
where
    D: Fn(StatusUpdate) + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (commands, command_rx) = mpsc::unbounded_channel();
    let handle = std::thread::Builder::new()
        .name("status-poller".to_string())
        .spawn(move || runtime.block_on(poller.run(command_rx)))?;
    Ok(PollerThread { commands, handle })
}
