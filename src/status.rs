use crate::format::{LiteralFormat, ScheduleFormat};
use crate::store::ConfigStore;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleStatus {
    Enabled,
    Disabled,
    Unknown,
}

impl ScheduleStatus {
    pub fn from_intent(enable: bool) -> Self {
        if enable {
            ScheduleStatus::Enabled
        } else {
            ScheduleStatus::Disabled
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ScheduleStatus::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Enabled => "enabled",
            ScheduleStatus::Disabled => "disabled",
            ScheduleStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleFlag {
    Daily,
    Weekly,
    Monthly,
    Boot,
}

impl ScheduleFlag {
    /// Every flag the mutator rewrites.
    pub const ALL: [ScheduleFlag; 4] = [
        ScheduleFlag::Daily,
        ScheduleFlag::Weekly,
        ScheduleFlag::Monthly,
        ScheduleFlag::Boot,
    ];

    /// Flags consulted when deriving a status. `Monthly` is written but never read.
    pub const RESOLVED: [ScheduleFlag; 3] = [
        ScheduleFlag::Daily,
        ScheduleFlag::Weekly,
        ScheduleFlag::Boot,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ScheduleFlag::Daily => "schedule_daily",
            ScheduleFlag::Weekly => "schedule_weekly",
            ScheduleFlag::Monthly => "schedule_monthly",
            ScheduleFlag::Boot => "schedule_boot",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScheduleFlag::Daily => "daily",
            ScheduleFlag::Weekly => "weekly",
            ScheduleFlag::Monthly => "monthly",
            ScheduleFlag::Boot => "boot",
        }
    }
}

/// Boolean-or-unknown view of the four scheduling flags. `None` means the key
/// was absent or its value was not a literal `"true"`/`"false"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleFlags {
    pub daily: Option<bool>,
    pub weekly: Option<bool>,
    pub monthly: Option<bool>,
    pub boot: Option<bool>,
}

impl ScheduleFlags {
    pub fn get(&self, flag: ScheduleFlag) -> Option<bool> {
        match flag {
            ScheduleFlag::Daily => self.daily,
            ScheduleFlag::Weekly => self.weekly,
            ScheduleFlag::Monthly => self.monthly,
            ScheduleFlag::Boot => self.boot,
        }
    }

    pub fn set(&mut self, flag: ScheduleFlag, value: Option<bool>) {
        match flag {
            ScheduleFlag::Daily => self.daily = value,
            ScheduleFlag::Weekly => self.weekly = value,
            ScheduleFlag::Monthly => self.monthly = value,
            ScheduleFlag::Boot => self.boot = value,
        }
    }

    /// Any active schedule counts as enabled; disabled requires every resolved
    /// flag to be a confident `false`.
    pub fn status(&self) -> ScheduleStatus {
        let values = ScheduleFlag::RESOLVED.map(|flag| self.get(flag));
        if values.contains(&Some(true)) {
            ScheduleStatus::Enabled
        } else if values.iter().all(|value| *value == Some(false)) {
            ScheduleStatus::Disabled
        } else {
            ScheduleStatus::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: ScheduleStatus,
    pub observed_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(status: ScheduleStatus) -> Self {
        Self {
            status,
            observed_at: Utc::now(),
        }
    }
}

/// A change between two confident observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    pub from: ScheduleStatus,
    pub to: ScheduleStatus,
}

impl TransitionEvent {
    /// Returns `None` when nothing changed or either side is `Unknown`.
    pub fn between(from: ScheduleStatus, to: ScheduleStatus) -> Option<Self> {
        if from == to || !from.is_known() || !to.is_known() {
            return None;
        }
        Some(Self { from, to })
    }
}

#[derive(Clone)]
pub struct StatusResolver {
    format: Arc<dyn ScheduleFormat>,
}

impl Default for StatusResolver {
    fn default() -> Self {
        Self::new(Arc::new(LiteralFormat))
    }
}

impl StatusResolver {
    pub fn new(format: Arc<dyn ScheduleFormat>) -> Self {
        Self { format }
    }

    pub fn flags(&self, blob: &str) -> ScheduleFlags {
        self.format.read_flags(blob)
    }

    pub fn resolve(&self, blob: &str) -> ScheduleStatus {
        self.flags(blob).status()
    }

    /// Reads the store and extracts every flag. A read failure is logged and
    /// leaves every flag undetermined, never raised.
    pub fn flags_store(&self, store: &dyn ConfigStore) -> ScheduleFlags {
        match store.read() {
            Ok(blob) => self.flags(&blob),
            Err(err) => {
                warn!(error = %err, "cannot resolve schedule status");
                ScheduleFlags::default()
            }
        }
    }

    pub fn resolve_store(&self, store: &dyn ConfigStore) -> ScheduleStatus {
        self.flags_store(store).status()
    }
}

pub fn resolve(blob: &str) -> ScheduleStatus {
    StatusResolver::default().resolve(blob)
}
