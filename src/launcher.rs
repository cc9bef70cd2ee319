use crate::error::Error;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalTool {
    /// Timeshift's own management GUI.
    ManagementGui,
    /// The older standalone toggle script.
    LegacyControl,
}

impl ExternalTool {
    pub fn label(&self) -> &'static str {
        match self {
            ExternalTool::ManagementGui => "Timeshift GUI",
            ExternalTool::LegacyControl => "legacy control",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolLauncher {
    gui_command: PathBuf,
    legacy_command: PathBuf,
}

impl ToolLauncher {
    pub fn new(gui_command: impl Into<PathBuf>, legacy_command: impl Into<PathBuf>) -> Self {
        Self {
            gui_command: gui_command.into(),
            legacy_command: legacy_command.into(),
        }
    }

    fn command_for(&self, tool: ExternalTool) -> &PathBuf {
        match tool {
            ExternalTool::ManagementGui => &self.gui_command,
            ExternalTool::LegacyControl => &self.legacy_command,
        }
    }

    /// Starts the tool detached; only a failure to spawn is reported.
    pub fn launch(&self, tool: ExternalTool) -> Result<(), Error> {
        let program = self.command_for(tool);
        let mut child = Command::new(program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::ExternalToolLaunchFailed {
                tool: tool.label().to_string(),
                source,
            })?;

        info!(tool = tool.label(), pid = child.id(), "launched external tool");
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}
