// Process launcher implementation over tokio::process

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

use pestpool_core::port::{
    ExitStatusInfo, LaunchError, OutputMode, ProcessHandle, ProcessLauncher, SpawnSpec,
};

#[cfg(unix)]
use std::time::Duration;

/// How long a terminated child gets to exit on SIGTERM before SIGKILL
#[cfg(unix)]
const GRACEFUL_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawns real OS processes with an explicit working directory per spawn
pub struct TokioProcessLauncher;

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn spawn(&self, spec: &SpawnSpec) -> Result<Box<dyn ProcessHandle>, LaunchError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).current_dir(&spec.cwd);
        if spec.output == OutputMode::Discard {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let child = cmd.spawn().map_err(|e| LaunchError::SpawnFailed {
            program: spec.program.clone(),
            cwd: spec.cwd.clone(),
            reason: e.to_string(),
        })?;
        debug!(pid = ?child.id(), command = %spec.command_line(), "spawned process");
        Ok(Box::new(TokioProcessHandle { child }))
    }
}

struct TokioProcessHandle {
    child: Child,
}

fn status_info(status: std::process::ExitStatus) -> ExitStatusInfo {
    ExitStatusInfo {
        code: status.code(),
        success: status.success(),
    }
}

#[async_trait]
impl ProcessHandle for TokioProcessHandle {
    async fn wait(&mut self) -> Result<ExitStatusInfo, LaunchError> {
        self.child
            .wait()
            .await
            .map(status_info)
            .map_err(|e| LaunchError::WaitFailed(e.to_string()))
    }

    fn try_wait(&mut self) -> Result<Option<ExitStatusInfo>, LaunchError> {
        self.child
            .try_wait()
            .map(|s| s.map(status_info))
            .map_err(|e| LaunchError::WaitFailed(e.to_string()))
    }

    /// SIGTERM with a bounded grace period, then SIGKILL (Unix); immediate
    /// kill on platforms without a graceful signal.
    async fn terminate(&mut self) -> Result<(), LaunchError> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            use tokio::time::timeout;

            let Some(pid) = self.child.id() else {
                // Already reaped
                return Ok(());
            };

            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => {}
                // Exited between id() and the signal
                Err(nix::errno::Errno::ESRCH) => return Ok(()),
                Err(e) => {
                    return Err(LaunchError::TerminateFailed(format!("SIGTERM failed: {e}")))
                }
            }

            if timeout(GRACEFUL_TERMINATE_TIMEOUT, self.child.wait())
                .await
                .is_ok()
            {
                return Ok(());
            }
            debug!(pid, "process ignored SIGTERM, escalating to SIGKILL");
        }

        self.child
            .kill()
            .await
            .map_err(|e| LaunchError::TerminateFailed(e.to_string()))
    }
}
