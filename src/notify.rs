use crate::status::ScheduleStatus;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconHint {
    Running,
    Warning,
    Error,
}

impl IconHint {
    /// Freedesktop icon name.
    pub fn icon_name(&self) -> &'static str {
        match self {
            IconHint::Running => "system-run",
            IconHint::Warning => "dialog-warning",
            IconHint::Error => "dialog-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: IconHint,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, icon: IconHint) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon,
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, IconHint::Error)
    }

    /// Popup announcing that schedules are now on or off. There is nothing to
    /// announce for `Unknown`.
    pub fn for_status(status: ScheduleStatus) -> Option<Self> {
        match status {
            ScheduleStatus::Enabled => Some(Self::new(
                "Timeshift enabled",
                "Automatic snapshots are now active",
                IconHint::Running,
            )),
            ScheduleStatus::Disabled => Some(Self::new(
                "Timeshift disabled",
                "Automatic snapshots are off",
                IconHint::Warning,
            )),
            ScheduleStatus::Unknown => None,
        }
    }
}

/// Fire-and-forget delivery. Implementations swallow their own failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Delivers through the desktop's `notify-send`.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: PathBuf,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("notify-send")
    }
}

impl DesktopNotifier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        let spawned = Command::new(&self.program)
            .arg("--app-name=Timeshift Indicator")
            .arg("--urgency=normal")
            .arg(format!("--icon={}", notification.icon.icon_name()))
            .arg(&notification.title)
            .arg(&notification.body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(err) => {
                debug!(error = %err, title = %notification.title, "notification not delivered");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, notification: &Notification) {
        debug!(title = %notification.title, "notifications disabled");
    }
}
