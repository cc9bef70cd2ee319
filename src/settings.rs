use crate::error::Error;
use crate::helper::{CommandHelper, DEFAULT_HELPER_TIMEOUT};
use crate::launcher::ToolLauncher;
use crate::notify::{DesktopNotifier, Notifier, SilentNotifier};
use crate::paths::DEFAULT_TIMESHIFT_CONFIG;
use crate::poller::DEFAULT_POLL_INTERVAL;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timeshift_config: PathBuf,
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
    pub helper_program: PathBuf,
    pub helper_args: Vec<String>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub helper_timeout: Duration,
    pub gui_command: PathBuf,
    pub legacy_command: PathBuf,
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeshift_config: PathBuf::from(DEFAULT_TIMESHIFT_CONFIG),
            poll_interval: DEFAULT_POLL_INTERVAL,
            helper_program: PathBuf::from("sudo"),
            helper_args: vec!["/usr/local/bin/toggle-timeshift.sh".to_string()],
            helper_timeout: DEFAULT_HELPER_TIMEOUT,
            gui_command: PathBuf::from("timeshift-gtk"),
            legacy_command: PathBuf::from("/usr/local/bin/timeshift-toggle-gui.sh"),
            notifications: true,
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

impl Settings {
    /// Loads the TOML settings file. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        let settings: Settings = toml::from_str(&text).with_context(|| {
            format!("failed to parse settings {} (expected TOML)", path.display())
        })?;
        settings
            .validate()
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidSettings {
                reason: "poll_interval must be greater than 0".to_string(),
            });
        }
        if self.helper_timeout.is_zero() {
            return Err(Error::InvalidSettings {
                reason: "helper_timeout must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_overrides(
        mut self,
        timeshift_config: Option<PathBuf>,
        poll_interval: Option<Duration>,
    ) -> std::result::Result<Self, Error> {
        if let Some(path) = timeshift_config {
            self.timeshift_config = path;
        }
        if let Some(interval) = poll_interval {
            self.poll_interval = interval;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn helper(&self) -> CommandHelper {
        CommandHelper::new(
            &self.helper_program,
            self.helper_args.clone(),
            self.helper_timeout,
        )
    }

    pub fn launcher(&self) -> ToolLauncher {
        ToolLauncher::new(&self.gui_command, &self.legacy_command)
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        if self.notifications {
            Arc::new(DesktopNotifier::default())
        } else {
            Arc::new(SilentNotifier)
        }
    }
}
