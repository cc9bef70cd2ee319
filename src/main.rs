use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use timeshift_indicator::helper::PrivilegedHelper;
use timeshift_indicator::init_logging;
use timeshift_indicator::mutator::{ConfigMutator, MutationOutcome};
use timeshift_indicator::notify::Notification;
use timeshift_indicator::paths::default_settings_path;
use timeshift_indicator::poller::{ControlCommand, StatusPoller, StatusUpdate};
use timeshift_indicator::settings::Settings;
use timeshift_indicator::status::{ScheduleFlag, StatusResolver};
use timeshift_indicator::store::{ConfigStore, FileConfigStore};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "timeshift-indicator")]
#[command(about = "Inspect and toggle Timeshift's scheduled snapshots")]
struct Cli {
    /// Settings file (TOML).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Timeshift configuration to watch instead of the configured one.
    #[arg(long, global = true)]
    timeshift_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the resolved status and each schedule flag.
    Status,
    /// Turn every schedule on.
    Enable,
    /// Turn every schedule off.
    Disable,
    /// Poll in the foreground and report transitions.
    Watch(WatchArgs),
}

#[derive(Debug, Args, Clone)]
struct WatchArgs {
    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Also send desktop notifications on transitions.
    #[arg(long, action = ArgAction::SetTrue)]
    notify: bool,
}

fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let interval = match &cli.command {
        Commands::Watch(args) => args.interval,
        _ => None,
    };
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let settings = Settings::load(&settings_path)?.with_overrides(cli.timeshift_config, interval)?;
    let store = Arc::new(FileConfigStore::existing(&settings.timeshift_config)?);

    match cli.command {
        Commands::Status => print_status(store.as_ref()),
        Commands::Enable => toggle(&settings, store, true).await,
        Commands::Disable => toggle(&settings, store, false).await,
        Commands::Watch(args) => watch(&settings, store, args.notify).await,
    }
}

fn print_status(store: &dyn ConfigStore) -> Result<()> {
    let flags = StatusResolver::default().flags_store(store);

    println!("status: {}", flags.status());
    for flag in ScheduleFlag::ALL {
        let value = match flags.get(flag) {
            Some(true) => "true",
            Some(false) => "false",
            None => "unknown",
        };
        println!("  {:<8} {value}", flag.name());
    }
    Ok(())
}

async fn toggle(settings: &Settings, store: Arc<FileConfigStore>, enable: bool) -> Result<()> {
    let helper: Arc<dyn PrivilegedHelper> = Arc::new(settings.helper());
    let mutator = ConfigMutator::new(store, helper);
    let outcome = mutator
        .set_enabled(enable)
        .await
        .context("schedule was not changed")?;

    let target = if enable { "enabled" } else { "disabled" };
    match outcome {
        MutationOutcome::Written => println!("schedules {target}"),
        MutationOutcome::AlreadyInState => println!("schedules already {target}"),
        MutationOutcome::ViaHelper => println!("schedules {target} via privileged helper"),
    }
    Ok(())
}

async fn watch(settings: &Settings, store: Arc<FileConfigStore>, notify: bool) -> Result<()> {
    let notifier = notify.then(|| settings.notifier());
    let mutator = ConfigMutator::new(store.clone(), Arc::new(settings.helper()));
    let poller = StatusPoller::new(
        store,
        StatusResolver::default(),
        mutator,
        settings.poll_interval,
        move |update| match update {
            StatusUpdate::Snapshot(snapshot) => {
                println!("{} {}", snapshot.observed_at.to_rfc3339(), snapshot.status);
            }
            StatusUpdate::Transition(event) => {
                println!("transition: {} -> {}", event.from, event.to);
                if let Some(notifier) = &notifier
                    && let Some(notification) = Notification::for_status(event.to)
                {
                    notifier.notify(&notification);
                }
            }
            StatusUpdate::IntentApplied { .. } | StatusUpdate::IntentFailed { .. } => {}
        },
    )?;

    info!(
        interval = %humantime::format_duration(settings.poll_interval),
        "watching Timeshift schedule (Ctrl-C to stop)"
    );
    println!("{} {}", poller.snapshot().observed_at.to_rfc3339(), poller.status());

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = command_tx.send(ControlCommand::Shutdown);
        }
    });

    poller.run(command_rx).await;
    Ok(())
}
