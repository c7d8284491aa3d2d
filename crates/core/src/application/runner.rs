// One-shot command runner

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::platform::PlatformFamily;
use crate::domain::rewrite_command_line;
use crate::error::{AppError, Result};
use crate::port::{OutputMode, ProcessLauncher, SpawnSpec, Workspace};

/// Executes one shell command string in an explicit working directory,
/// normalizing the executable name per platform first.
pub struct CommandRunner {
    launcher: Arc<dyn ProcessLauncher>,
    workspace: Arc<dyn Workspace>,
}

impl CommandRunner {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, workspace: Arc<dyn Workspace>) -> Self {
        Self { launcher, workspace }
    }

    /// Run `cmd_str` through the platform's command interpreter in `cwd`.
    ///
    /// A non-zero exit status is an error on Windows only; other platforms
    /// do not check it. That asymmetry matches the estimation tooling this
    /// wraps and is pinned by tests.
    pub async fn run(&self, cmd_str: &str, cwd: &Path) -> Result<()> {
        let platform = PlatformFamily::host();
        let rewritten = rewrite_command_line(cmd_str, platform, |exe| {
            self.workspace.exists(&cwd.join(exe))
        })?;
        debug!(command = %rewritten, dir = %cwd.display(), "running command");

        let (shell, flag) = platform.interpreter();
        let spec = SpawnSpec {
            program: shell.to_string(),
            args: vec![flag.to_string(), rewritten.clone()],
            cwd: cwd.to_path_buf(),
            output: OutputMode::Inherit,
        };
        let mut handle = self.launcher.spawn(&spec).await?;
        let status = handle.wait().await?;

        if platform == PlatformFamily::Windows && !status.success {
            return Err(AppError::CommandFailed {
                cmd: rewritten,
                code: status.code,
            });
        }
        info!(command = %rewritten, code = ?status.code, "command finished");
        Ok(())
    }
}
