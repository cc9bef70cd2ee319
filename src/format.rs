use crate::status::{ScheduleFlag, ScheduleFlags};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// How scheduling flags are located in, and patched into, the raw config text.
///
/// The resolver and mutator only talk to this trait, so a structured parser
/// can replace the literal patcher without touching either of them.
pub trait ScheduleFormat: Send + Sync {
    fn read_flags(&self, blob: &str) -> ScheduleFlags;

    /// Returns `blob` with every flag forced to `enable`. Must be idempotent
    /// and must leave all other text untouched.
    fn write_flags(&self, blob: &str, enable: bool) -> String;
}

/// Treats the config as opaque text and edits only the quoted boolean that
/// follows each `"schedule_*"` key, the way Timeshift itself writes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralFormat;

struct FlagPattern {
    flag: ScheduleFlag,
    regex: Regex,
}

static PATTERNS: LazyLock<Vec<FlagPattern>> = LazyLock::new(|| {
    ScheduleFlag::ALL
        .iter()
        .map(|&flag| FlagPattern {
            flag,
            regex: flag_regex(flag),
        })
        .collect()
});

fn flag_regex(flag: ScheduleFlag) -> Regex {
    let pattern = format!(
        r#"("{}"\s*:\s*")(true|false)(")"#,
        regex::escape(flag.key())
    );
    Regex::new(&pattern).expect("flag pattern is a valid regex")
}

fn literal(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

impl ScheduleFormat for LiteralFormat {
    fn read_flags(&self, blob: &str) -> ScheduleFlags {
        let mut flags = ScheduleFlags::default();
        for pattern in PATTERNS.iter() {
            let value = pattern
                .regex
                .captures(blob)
                .map(|caps| &caps[2] == literal(true));
            flags.set(pattern.flag, value);
        }
        flags
    }

    fn write_flags(&self, blob: &str, enable: bool) -> String {
        let from = literal(!enable);
        let to = literal(enable);
        let mut text = blob.to_string();
        for pattern in PATTERNS.iter() {
            text = pattern
                .regex
                .replace_all(&text, |caps: &Captures| {
                    if &caps[2] == from {
                        format!("{}{}{}", &caps[1], to, &caps[3])
                    } else {
                        caps[0].to_string()
                    }
                })
                .into_owned();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::{LiteralFormat, ScheduleFormat};

    const TIMESHIFT_JSON: &str = r#"{
  "backup_device_uuid" : "5a3e1c0e-1111-4a1b-9c6f-0123456789ab",
  "do_first_run" : "false",
  "btrfs_mode" : "false",
  "schedule_monthly" : "true",
  "schedule_weekly" : "false",
  "schedule_daily" : "true",
  "schedule_hourly" : "false",
  "schedule_boot" : "false",
  "count_daily" : "5",
  "exclude" : [
    "/home/user/**"
  ]
}
"#;

    #[test]
    fn enabling_rewrites_only_false_schedule_values() {
        let patched = LiteralFormat.write_flags(TIMESHIFT_JSON, true);
        assert!(patched.contains(r#""schedule_weekly" : "true""#));
        assert!(patched.contains(r#""schedule_boot" : "true""#));
        assert!(patched.contains(r#""schedule_daily" : "true""#));
        assert!(patched.contains(r#""schedule_hourly" : "false""#));
        assert!(patched.contains(r#""btrfs_mode" : "false""#));
        assert!(patched.contains(r#""count_daily" : "5""#));
    }

    #[test]
    fn disabling_includes_monthly() {
        let patched = LiteralFormat.write_flags(TIMESHIFT_JSON, false);
        let flags = LiteralFormat.read_flags(&patched);
        assert_eq!(flags.daily, Some(false));
        assert_eq!(flags.weekly, Some(false));
        assert_eq!(flags.monthly, Some(false));
        assert_eq!(flags.boot, Some(false));
        assert!(patched.contains(r#""do_first_run" : "false""#));
    }

    #[test]
    fn preserves_original_spacing() {
        let compact = r#"{"schedule_daily":"false","schedule_weekly":"false","schedule_boot":"false"}"#;
        let patched = LiteralFormat.write_flags(compact, true);
        assert_eq!(
            patched,
            r#"{"schedule_daily":"true","schedule_weekly":"true","schedule_boot":"true"}"#
        );
    }

    #[test]
    fn replaces_every_occurrence_of_a_key() {
        let blob = r#""schedule_boot" : "true", "schedule_boot" : "true""#;
        let patched = LiteralFormat.write_flags(blob, false);
        assert_eq!(patched, r#""schedule_boot" : "false", "schedule_boot" : "false""#);
    }

    #[test]
    fn missing_keys_are_left_missing() {
        let blob = r#"{"schedule_daily" : "false"}"#;
        let flags = LiteralFormat.read_flags(&LiteralFormat.write_flags(blob, true));
        assert_eq!(flags.daily, Some(true));
        assert_eq!(flags.weekly, None);
        assert_eq!(flags.boot, None);
    }
}
