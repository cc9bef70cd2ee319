use crate::error::Error;
use crate::format::{LiteralFormat, ScheduleFormat};
use crate::helper::{HelperAction, PrivilegedHelper};
use crate::store::ConfigStore;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Written,
    /// Every flag already matched; nothing was written.
    AlreadyInState,
    ViaHelper,
}

/// Pure textual form of the mutation: `setEnabled(blob, enable)`.
pub fn set_enabled(blob: &str, enable: bool) -> String {
    LiteralFormat.write_flags(blob, enable)
}

#[derive(Clone)]
pub struct ConfigMutator {
    store: Arc<dyn ConfigStore>,
    format: Arc<dyn ScheduleFormat>,
    helper: Arc<dyn PrivilegedHelper>,
}

impl ConfigMutator {
    pub fn new(store: Arc<dyn ConfigStore>, helper: Arc<dyn PrivilegedHelper>) -> Self {
        Self::with_format(store, Arc::new(LiteralFormat), helper)
    }

    pub fn with_format(
        store: Arc<dyn ConfigStore>,
        format: Arc<dyn ScheduleFormat>,
        helper: Arc<dyn PrivilegedHelper>,
    ) -> Self {
        Self {
            store,
            format,
            helper,
        }
    }

    /// Applies the intent to the store, falling back to the privileged helper
    /// when the config cannot be read or written directly.
    pub async fn set_enabled(&self, enable: bool) -> Result<MutationOutcome, Error> {
        let direct_error = match self.patch_store(enable) {
            Ok(outcome) => {
                info!(enable, ?outcome, path = %self.store.path().display(), "schedule updated");
                return Ok(outcome);
            }
            Err(err) => err,
        };

        warn!(error = %direct_error, "direct config update failed, trying privileged helper");
        let action = HelperAction::from_intent(enable);
        match self.helper.run(action).await {
            Ok(()) => {
                info!(action = action.as_arg(), "privileged helper applied schedule change");
                Ok(MutationOutcome::ViaHelper)
            }
            Err(helper_error) => Err(Error::FallbackFailed {
                write_error: direct_error.to_string(),
                helper_error: format!("{helper_error:#}"),
            }),
        }
    }

    fn patch_store(&self, enable: bool) -> Result<MutationOutcome, Error> {
        let blob = self.store.read()?;
        let patched = self.format.write_flags(&blob, enable);
        if patched == blob {
            return Ok(MutationOutcome::AlreadyInState);
        }
        self.store.write(&patched)?;
        Ok(MutationOutcome::Written)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{ConfigMutator, MutationOutcome, set_enabled};
    use crate::error::Error;
    use crate::helper::{HelperAction, PrivilegedHelper};
    use crate::status::{ScheduleStatus, resolve};
    use crate::store::ConfigStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    pub(crate) const ALL_FALSE: &str = r#"{
  "schedule_monthly" : "false",
  "schedule_weekly" : "false",
  "schedule_daily" : "false",
  "schedule_hourly" : "false",
  "schedule_boot" : "false"
}"#;

    pub(crate) const MIXED: &str = r#"{
  "schedule_monthly" : "false",
  "schedule_weekly" : "true",
  "schedule_daily" : "false",
  "schedule_boot" : "true"
}"#;

    /// In-memory store whose reads and writes can be made to fail.
    #[derive(Clone)]
    pub(crate) struct MemoryStore {
        blob: Arc<Mutex<String>>,
        writes: Arc<Mutex<u32>>,
        read_only: bool,
        unreadable: Arc<Mutex<bool>>,
    }

    impl MemoryStore {
        pub(crate) fn new(blob: &str) -> Self {
            Self {
                blob: Arc::new(Mutex::new(blob.to_string())),
                writes: Arc::new(Mutex::new(0)),
                read_only: false,
                unreadable: Arc::new(Mutex::new(false)),
            }
        }

        pub(crate) fn read_only(blob: &str) -> Self {
            Self {
                read_only: true,
                ..Self::new(blob)
            }
        }

        pub(crate) fn contents(&self) -> String {
            self.blob.lock().expect("blob mutex poisoned").clone()
        }

        pub(crate) fn replace(&self, blob: &str) {
            *self.blob.lock().expect("blob mutex poisoned") = blob.to_string();
        }

        pub(crate) fn set_unreadable(&self, unreadable: bool) {
            *self.unreadable.lock().expect("flag mutex poisoned") = unreadable;
        }

        pub(crate) fn writes(&self) -> u32 {
            *self.writes.lock().expect("writes mutex poisoned")
        }
    }

    impl ConfigStore for MemoryStore {
        fn path(&self) -> &Path {
            Path::new("memory://timeshift.json")
        }

        fn read(&self) -> Result<String, Error> {
            if *self.unreadable.lock().expect("flag mutex poisoned") {
                return Err(Error::ConfigUnreadable {
                    path: PathBuf::from("memory://timeshift.json"),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            Ok(self.contents())
        }

        fn write(&self, blob: &str) -> Result<(), Error> {
            if self.read_only {
                return Err(Error::ConfigUnwritable {
                    path: PathBuf::from("memory://timeshift.json"),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            *self.writes.lock().expect("writes mutex poisoned") += 1;
            self.replace(blob);
            Ok(())
        }
    }

    /// Records invocations; optionally applies the change to a store like the
    /// real root helper would.
    #[derive(Clone, Default)]
    pub(crate) struct FakeHelper {
        pub(crate) calls: Arc<Mutex<Vec<HelperAction>>>,
        pub(crate) fail: bool,
        pub(crate) target: Option<MemoryStore>,
    }

    #[async_trait]
    impl PrivilegedHelper for FakeHelper {
        async fn run(&self, action: HelperAction) -> Result<()> {
            self.calls.lock().expect("calls mutex poisoned").push(action);
            if self.fail {
                return Err(anyhow!("sudo: a password is required"));
            }
            if let Some(store) = &self.target {
                store.replace(&set_enabled(&store.contents(), action == HelperAction::On));
            }
            Ok(())
        }
    }

    #[test]
    fn enabling_is_idempotent() {
        for blob in [ALL_FALSE, MIXED] {
            let once = set_enabled(blob, true);
            assert_eq!(set_enabled(&once, true), once);
            let off = set_enabled(blob, false);
            assert_eq!(set_enabled(&off, false), off);
        }
    }

    #[test]
    fn round_trips_through_resolver() {
        for blob in [ALL_FALSE, MIXED] {
            assert_eq!(resolve(&set_enabled(blob, true)), ScheduleStatus::Enabled);
            assert_eq!(resolve(&set_enabled(blob, false)), ScheduleStatus::Disabled);
        }
    }

    #[test]
    fn disabling_an_all_false_blob_is_a_text_no_op() {
        assert_eq!(set_enabled(ALL_FALSE, false), ALL_FALSE);
        assert_eq!(resolve(ALL_FALSE), ScheduleStatus::Disabled);
    }

    #[tokio::test]
    async fn writes_patched_blob_directly() {
        let store = MemoryStore::new(ALL_FALSE);
        let helper = FakeHelper::default();
        let mutator = ConfigMutator::new(Arc::new(store.clone()), Arc::new(helper.clone()));

        let outcome = mutator.set_enabled(true).await.expect("mutation");
        assert_eq!(outcome, MutationOutcome::Written);
        assert_eq!(resolve(&store.contents()), ScheduleStatus::Enabled);
        assert!(store.contents().contains(r#""schedule_monthly" : "true""#));
        assert!(store.contents().contains(r#""schedule_hourly" : "false""#));
        assert!(helper.calls.lock().expect("calls").is_empty());
    }

    #[tokio::test]
    async fn unchanged_blob_is_not_rewritten() {
        let store = MemoryStore::new(ALL_FALSE);
        let mutator =
            ConfigMutator::new(Arc::new(store.clone()), Arc::new(FakeHelper::default()));

        let outcome = mutator.set_enabled(false).await.expect("mutation");
        assert_eq!(outcome, MutationOutcome::AlreadyInState);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.contents(), ALL_FALSE);
    }

    #[tokio::test]
    async fn unwritable_store_falls_back_to_helper() {
        let store = MemoryStore::read_only(MIXED);
        let helper = FakeHelper::default();
        let mutator = ConfigMutator::new(Arc::new(store.clone()), Arc::new(helper.clone()));

        let outcome = mutator.set_enabled(false).await.expect("helper succeeds");
        assert_eq!(outcome, MutationOutcome::ViaHelper);
        assert_eq!(
            *helper.calls.lock().expect("calls"),
            vec![HelperAction::Off]
        );
        assert_eq!(store.contents(), MIXED);
    }

    #[tokio::test]
    async fn unreadable_store_falls_back_to_helper() {
        let store = MemoryStore::new(MIXED);
        store.set_unreadable(true);
        let helper = FakeHelper::default();
        let mutator = ConfigMutator::new(Arc::new(store.clone()), Arc::new(helper.clone()));

        let outcome = mutator.set_enabled(true).await.expect("helper succeeds");
        assert_eq!(outcome, MutationOutcome::ViaHelper);
        assert_eq!(*helper.calls.lock().expect("calls"), vec![HelperAction::On]);
    }

    #[tokio::test]
    async fn failed_fallback_reports_both_errors_and_leaves_blob_untouched() {
        let store = MemoryStore::read_only(MIXED);
        let helper = FakeHelper {
            fail: true,
            ..FakeHelper::default()
        };
        let mutator = ConfigMutator::new(Arc::new(store.clone()), Arc::new(helper));

        let err = mutator.set_enabled(false).await.expect_err("fallback fails");
        assert!(matches!(err, Error::FallbackFailed { .. }));
        let message = err.to_string();
        assert!(message.contains("failed to write"));
        assert!(message.contains("password is required"));
        assert_eq!(store.contents(), MIXED);
    }
}
