use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub const DEFAULT_HELPER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperAction {
    On,
    Off,
}

impl HelperAction {
    pub fn from_intent(enable: bool) -> Self {
        if enable {
            HelperAction::On
        } else {
            HelperAction::Off
        }
    }

    pub fn as_arg(&self) -> &'static str {
        match self {
            HelperAction::On => "on",
            HelperAction::Off => "off",
        }
    }
}

/// Escape hatch used when the config cannot be written directly.
#[async_trait]
pub trait PrivilegedHelper: Send + Sync {
    async fn run(&self, action: HelperAction) -> Result<()>;
}

/// Runs `program [leading_args..] on|off` and treats a zero exit status
/// within the timeout as success. Nothing is retried.
#[derive(Debug, Clone)]
pub struct CommandHelper {
    program: PathBuf,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl CommandHelper {
    pub fn new(program: impl Into<PathBuf>, leading_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            leading_args,
            timeout,
        }
    }

    fn describe(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.leading_args.iter().cloned());
        parts.join(" ")
    }
}

#[async_trait]
impl PrivilegedHelper for CommandHelper {
    async fn run(&self, action: HelperAction) -> Result<()> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg(action.as_arg())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                anyhow!(
                    "{} timed out after {:.0}s",
                    self.describe(),
                    self.timeout.as_secs_f32()
                )
            })?
            .with_context(|| format!("failed to execute {}", self.describe()))?;

        if !output.status.success() {
            bail!(
                "{} {} exited with {}: {}",
                self.describe(),
                action.as_arg(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}
