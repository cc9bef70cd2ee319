use crate::launcher::{ExternalTool, ToolLauncher};
use crate::notify::{Notification, Notifier};
use crate::poller::{ControlCommand, StatusUpdate};
use crate::status::{ScheduleStatus, StatusSnapshot};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// The UI surface. Both calls are idempotent and run on the presentation
/// context only.
pub trait Presenter {
    fn render_status(&mut self, snapshot: &StatusSnapshot);
    fn render_menu_state(&mut self, snapshot: &StatusSnapshot);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLabel {
    pub headline: &'static str,
    pub detail: &'static str,
}

impl StatusLabel {
    pub fn menu_text(&self) -> String {
        format!("{}\n{}", self.headline, self.detail)
    }
}

pub fn status_label(status: ScheduleStatus) -> StatusLabel {
    match status {
        ScheduleStatus::Enabled => StatusLabel {
            headline: "Timeshift: enabled",
            detail: "(automatic snapshots are running)",
        },
        ScheduleStatus::Disabled => StatusLabel {
            headline: "Timeshift: DISABLED",
            detail: "(no automatic snapshots)",
        },
        ScheduleStatus::Unknown => StatusLabel {
            headline: "Timeshift: status unknown",
            detail: "(could not read configuration)",
        },
    }
}

/// Which toggles make sense for the current status as `(enable, disable)`.
/// An unknown status leaves both available.
pub fn toggle_availability(status: ScheduleStatus) -> (bool, bool) {
    match status {
        ScheduleStatus::Enabled => (false, true),
        ScheduleStatus::Disabled => (true, false),
        ScheduleStatus::Unknown => (true, true),
    }
}

/// Presentation-side consumer of worker updates. Holds only a read-only copy
/// of the latest snapshot.
pub struct UpdateRouter {
    notifier: Arc<dyn Notifier>,
    latest: Option<StatusSnapshot>,
}

impl UpdateRouter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            latest: None,
        }
    }

    pub fn latest(&self) -> Option<&StatusSnapshot> {
        self.latest.as_ref()
    }

    pub fn apply(&mut self, presenter: &mut dyn Presenter, update: StatusUpdate) {
        match update {
            StatusUpdate::Snapshot(snapshot) => {
                presenter.render_status(&snapshot);
                presenter.render_menu_state(&snapshot);
                self.latest = Some(snapshot);
            }
            StatusUpdate::Transition(event) => {
                if let Some(notification) = Notification::for_status(event.to) {
                    self.notifier.notify(&notification);
                }
            }
            StatusUpdate::IntentApplied { target } => {
                if let Some(notification) = Notification::for_status(target) {
                    self.notifier.notify(&notification);
                }
            }
            StatusUpdate::IntentFailed { message, .. } => {
                self.notifier
                    .notify(&Notification::error("Could not change Timeshift", message));
            }
        }
    }
}

/// User intents coming out of the menu. Toggles are handed to the worker;
/// launches happen here because spawning is non-blocking.
pub struct IntentHandler {
    commands: UnboundedSender<ControlCommand>,
    launcher: ToolLauncher,
    notifier: Arc<dyn Notifier>,
}

impl IntentHandler {
    pub fn new(
        commands: UnboundedSender<ControlCommand>,
        launcher: ToolLauncher,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            commands,
            launcher,
            notifier,
        }
    }

    pub fn on_enable_requested(&self) {
        self.send(ControlCommand::Enable);
    }

    pub fn on_disable_requested(&self) {
        self.send(ControlCommand::Disable);
    }

    pub fn on_open_external_tool_requested(&self, tool: ExternalTool) {
        if let Err(err) = self.launcher.launch(tool) {
            warn!(error = %err, "external tool launch failed");
            self.notifier.notify(&Notification::error(
                "Error",
                format!("Could not open the {}", tool.label()),
            ));
        }
    }

    pub fn on_quit_requested(&self) {
        self.send(ControlCommand::Shutdown);
    }

    fn send(&self, command: ControlCommand) {
        if self.commands.send(command).is_err() {
            warn!(?command, "status poller is no longer running");
        }
    }
}
