//! Keeps a tray indicator in sync with Timeshift's scheduled snapshots and
//! lets the user switch them on or off.

pub mod error;
pub mod format;
pub mod helper;
pub mod launcher;
pub mod mutator;
pub mod notify;
pub mod paths;
pub mod poller;
pub mod presenter;
pub mod settings;
pub mod status;
pub mod store;

pub use error::Error;

/// Logs go to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
