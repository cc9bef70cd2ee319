use std::path::PathBuf;

pub const DEFAULT_TIMESHIFT_CONFIG: &str = "/etc/timeshift/timeshift.json";

pub fn default_settings_dir() -> PathBuf {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".config"),
            None => PathBuf::from("."),
        },
    };
    base.join("timeshift-indicator")
}

pub fn default_settings_path() -> PathBuf {
    default_settings_dir().join("config.toml")
}
