use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoopBuilder};
use timeshift_indicator::init_logging;
use timeshift_indicator::launcher::ExternalTool;
use timeshift_indicator::mutator::ConfigMutator;
use timeshift_indicator::paths::default_settings_path;
use timeshift_indicator::poller::{StatusPoller, StatusUpdate, spawn_poller_thread};
use timeshift_indicator::presenter::{
    IntentHandler, Presenter, UpdateRouter, status_label, toggle_availability,
};
use timeshift_indicator::settings::Settings;
use timeshift_indicator::status::{ScheduleStatus, StatusResolver, StatusSnapshot};
use timeshift_indicator::store::FileConfigStore;
use tracing::{info, warn};
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

#[derive(Debug, Clone)]
enum UserEvent {
    Menu(MenuEvent),
    Status(StatusUpdate),
}

#[derive(Debug, Parser)]
#[command(name = "timeshift-panel")]
#[command(about = "Tray indicator for Timeshift's scheduled snapshots")]
struct Args {
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    timeshift_config: Option<PathBuf>,

    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,
}

fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let settings_path = args.settings.unwrap_or_else(default_settings_path);
    let settings =
        Settings::load(&settings_path)?.with_overrides(args.timeshift_config, args.interval)?;
    // Nothing graphical exists until the config is known to be there.
    let store = Arc::new(FileConfigStore::existing(&settings.timeshift_config)?);
    let notifier = settings.notifier();

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let proxy_for_menu = proxy.clone();
    MenuEvent::set_event_handler(Some(move |event| {
        let _ = proxy_for_menu.send_event(UserEvent::Menu(event));
    }));

    let mutator = ConfigMutator::new(store.clone(), Arc::new(settings.helper()));
    let proxy_for_status = proxy.clone();
    let poller = StatusPoller::new(
        store,
        StatusResolver::default(),
        mutator,
        settings.poll_interval,
        move |update| {
            let _ = proxy_for_status.send_event(UserEvent::Status(update));
        },
    )?;
    let initial = poller.snapshot();
    let worker = spawn_poller_thread(poller).context("failed to start status poller")?;

    let intents = IntentHandler::new(worker.commands(), settings.launcher(), notifier.clone());
    let mut router = UpdateRouter::new(notifier);

    let status_item = MenuItem::new("Loading status...", false, None);
    let enable_item = MenuItem::new("Enable Timeshift", true, None);
    let disable_item = MenuItem::new("Disable Timeshift", true, None);
    let gui_item = MenuItem::new("Open Timeshift GUI", true, None);
    let legacy_item = MenuItem::new("Open legacy control", true, None);
    let quit_item = MenuItem::new("Quit indicator", true, None);

    let menu = Menu::new();
    menu.append(&status_item)?;
    menu.append(&PredefinedMenuItem::separator())?;
    menu.append(&enable_item)?;
    menu.append(&disable_item)?;
    menu.append(&PredefinedMenuItem::separator())?;
    menu.append(&gui_item)?;
    menu.append(&legacy_item)?;
    menu.append(&PredefinedMenuItem::separator())?;
    menu.append(&quit_item)?;

    let mut panel = TrayPanel {
        tray_icon: None,
        icons: IconSet::new(),
        status_item,
        enable_item,
        disable_item,
    };
    let mut worker = Some(worker);

    info!(pid = std::process::id(), "timeshift panel started");

    event_loop.run(move |event, _target, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(StartCause::Init) => {
                if panel.tray_icon.is_none() {
                    let built = TrayIconBuilder::new()
                        .with_menu(Box::new(menu.clone()))
                        .with_tooltip(status_label(initial.status).headline)
                        .with_title(status_label(initial.status).headline)
                        .with_icon(panel.icons.icon(initial.status))
                        .build();

                    match built {
                        Ok(icon) => panel.tray_icon = Some(icon),
                        Err(err) => {
                            warn!(error = %err, "failed to create tray icon");
                            panel.status_item.set_text("Failed to init tray icon");
                        }
                    }
                }
                router.apply(&mut panel, StatusUpdate::Snapshot(initial.clone()));
            }
            Event::UserEvent(UserEvent::Menu(menu_event)) => {
                if menu_event.id == panel.enable_item.id() {
                    intents.on_enable_requested();
                } else if menu_event.id == panel.disable_item.id() {
                    intents.on_disable_requested();
                } else if menu_event.id == gui_item.id() {
                    intents.on_open_external_tool_requested(ExternalTool::ManagementGui);
                } else if menu_event.id == legacy_item.id() {
                    intents.on_open_external_tool_requested(ExternalTool::LegacyControl);
                } else if menu_event.id == quit_item.id() {
                    intents.on_quit_requested();
                    if let Some(worker) = worker.take() {
                        worker.shutdown();
                    }
                    info!("timeshift panel stopping");
                    *control_flow = ControlFlow::Exit;
                }
            }
            Event::UserEvent(UserEvent::Status(update)) => {
                router.apply(&mut panel, update);
            }
            _ => {}
        }
    });
}

struct TrayPanel {
    tray_icon: Option<TrayIcon>,
    icons: IconSet,
    status_item: MenuItem,
    enable_item: MenuItem,
    disable_item: MenuItem,
}

impl Presenter for TrayPanel {
    fn render_status(&mut self, snapshot: &StatusSnapshot) {
        if let Some(tray_icon) = self.tray_icon.as_ref() {
            let headline = status_label(snapshot.status).headline;
            let _ = tray_icon.set_icon(Some(self.icons.icon(snapshot.status)));
            let _ = tray_icon.set_tooltip(Some(headline));
            tray_icon.set_title(Some(headline));
        }
    }

    fn render_menu_state(&mut self, snapshot: &StatusSnapshot) {
        self.status_item
            .set_text(status_label(snapshot.status).menu_text());
        let (can_enable, can_disable) = toggle_availability(snapshot.status);
        self.enable_item.set_enabled(can_enable);
        self.disable_item.set_enabled(can_disable);
    }
}

struct IconSet {
    enabled: Icon,
    disabled: Icon,
    unknown: Icon,
}

impl IconSet {
    fn new() -> Self {
        Self {
            enabled: build_status_icon([46, 204, 113]),
            disabled: build_status_icon([231, 76, 60]),
            unknown: build_status_icon([160, 160, 160]),
        }
    }

    fn icon(&self, status: ScheduleStatus) -> Icon {
        match status {
            ScheduleStatus::Enabled => self.enabled.clone(),
            ScheduleStatus::Disabled => self.disabled.clone(),
            ScheduleStatus::Unknown => self.unknown.clone(),
        }
    }
}

/// A filled disc with a dark rim.
fn build_status_icon(fill_rgb: [u8; 3]) -> Icon {
    let size: usize = 22;
    let mut rgba = Vec::with_capacity(size * size * 4);
    let rim = [40, 40, 40, 255];
    let fill = [fill_rgb[0], fill_rgb[1], fill_rgb[2], 255];
    let background = [0, 0, 0, 0];
    let center = (size as f32 - 1.0) / 2.0;
    let radius = size as f32 / 2.0 - 1.0;

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let distance = (dx * dx + dy * dy).sqrt();
            let pixel = if distance <= radius - 2.0 {
                fill
            } else if distance <= radius {
                rim
            } else {
                background
            };
            rgba.extend_from_slice(&pixel);
        }
    }

    Icon::from_rgba(rgba, size as u32, size as u32).expect("valid tray icon")
}
