use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the status engine.
///
/// Only `StartupConfigMissing` and `InvalidSettings` are allowed to end the
/// process; everything else is turned into `ScheduleStatus::Unknown` or a
/// user-visible notification by the component that performed the I/O.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read Timeshift config {}: {source}", .path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write Timeshift config {}: {source}", .path.display())]
    ConfigUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not change schedule ({write_error}); privileged helper failed: {helper_error}")]
    FallbackFailed {
        write_error: String,
        helper_error: String,
    },

    #[error("Timeshift config {} does not exist", .path.display())]
    StartupConfigMissing { path: PathBuf },

    #[error("failed to launch {tool}: {source}")]
    ExternalToolLaunchFailed {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings: {reason}")]
    InvalidSettings { reason: String },
}
