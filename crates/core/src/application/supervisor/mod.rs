// Worker-pool supervisor - replica creation, process lifecycle, cleanup

pub mod constants;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::platform::{ensure_local_prefix, PlatformFamily};
use crate::domain::rendezvous::LOCAL_HOST;
use crate::domain::{DomainError, PoolConfig, PoolOutcome, RendezvousAddr, HOSTNAME_FLAG};
use crate::error::Result;
use crate::port::{ExitStatusInfo, OutputMode, ProcessHandle, ProcessLauncher, SpawnSpec, Workspace};

use constants::*;

/// One launched worker: its replica directory and live process handle
struct WorkerProcess {
    dir: PathBuf,
    handle: Box<dyn ProcessHandle>,
}

/// Supervises a pool of estimation processes against one optional master.
///
/// The whole lifecycle runs sequentially: replicate, spawn, drain, clean up.
/// Working directories are passed explicitly per spawn; nothing here mutates
/// process-global state, so concurrent runs are safe.
#[derive(Clone)]
pub struct PoolSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    workspace: Arc<dyn Workspace>,
}

impl PoolSupervisor {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, workspace: Arc<dyn Workspace>) -> Self {
        Self { launcher, workspace }
    }

    /// Run a full pool lifecycle per the config
    pub async fn run(&self, config: &PoolConfig) -> Result<PoolOutcome> {
        self.validate(config)?;

        let exe_arg = self.exe_argument(config);
        let host = config
            .hostname
            .clone()
            .unwrap_or_else(|| LOCAL_HOST.to_string());
        let rendezvous = RendezvousAddr::new(host, config.port);

        let master = match &config.master_dir {
            Some(name) => Some(self.start_master(config, name, &exe_arg, &rendezvous).await?),
            None => None,
        };

        let mut workers = self.start_workers(config, &exe_arg, &rendezvous).await?;

        let master_exit = match master {
            Some(mut handle) => {
                let status = self.drain_master(&mut handle, config.silent_master).await?;
                // Kill whatever is still connected to the vanished master
                for worker in workers.iter_mut() {
                    if let Err(e) = worker.handle.terminate().await {
                        warn!(dir = %worker.dir.display(), error = %e, "failed to terminate worker");
                    }
                }
                status.code
            }
            None => None,
        };

        // The estimation executable may spawn its own pre/post-processing
        // children; waiting on every worker lets those finish too.
        for worker in workers.iter_mut() {
            if let Err(e) = worker.handle.wait().await {
                warn!(dir = %worker.dir.display(), error = %e, "failed waiting on worker");
            }
        }

        let worker_dirs: Vec<PathBuf> = workers.into_iter().map(|w| w.dir).collect();
        let leftover_dirs = if config.cleanup {
            self.cleanup_worker_dirs(worker_dirs.clone()).await
        } else {
            Vec::new()
        };

        Ok(PoolOutcome {
            master_exit,
            worker_dirs,
            leftover_dirs,
        })
    }

    /// Fail loudly on missing template/root/control file before any spawn
    fn validate(&self, config: &PoolConfig) -> Result<()> {
        if !self.workspace.is_dir(&config.template_dir) {
            return Err(DomainError::TemplateNotFound(config.template_dir.clone()).into());
        }
        if !self.workspace.is_dir(&config.worker_root) {
            return Err(DomainError::WorkerRootNotFound(config.worker_root.clone()).into());
        }

        let base = match &config.run_subdir {
            Some(sub) => config.template_dir.join(sub),
            None => config.template_dir.clone(),
        };

        let exe_path = base.join(&config.exe_rel_path);
        if !self.workspace.exists(&exe_path) {
            warn!(
                path = %exe_path.display(),
                "executable not found in template; assuming it resolves via the search path"
            );
        }

        let control_path = base.join(&config.control_rel_path);
        if !self.workspace.exists(&control_path) {
            return Err(DomainError::ControlFileNotFound(control_path).into());
        }
        Ok(())
    }

    /// The executable token passed to spawned processes.
    ///
    /// Normalized only when the executable is actually present at the
    /// template root; otherwise the name is passed through for PATH lookup.
    fn exe_argument(&self, config: &PoolConfig) -> String {
        if self
            .workspace
            .exists(&config.template_dir.join(&config.exe_rel_path))
        {
            match PlatformFamily::host() {
                PlatformFamily::Windows => {
                    PlatformFamily::Windows.ensure_exe_suffix(&config.exe_rel_path)
                }
                PlatformFamily::Unix => ensure_local_prefix(&config.exe_rel_path),
            }
        } else {
            config.exe_rel_path.clone()
        }
    }

    async fn start_master(
        &self,
        config: &PoolConfig,
        name: &str,
        exe_arg: &str,
        rendezvous: &RendezvousAddr,
    ) -> Result<Box<dyn ProcessHandle>> {
        let master_path = PathBuf::from(name);

        // "." means run the master in place without replication
        if name != "." {
            if self.workspace.exists(&master_path) {
                info!(dir = %master_path.display(), "removing pre-existing master dir");
                self.workspace.remove_tree(&master_path).await?;
            }
            self.workspace
                .copy_tree(&config.template_dir, &master_path)
                .await?;
        }

        let spec = SpawnSpec {
            program: exe_arg.to_string(),
            args: vec![
                config.control_rel_path.clone(),
                HOSTNAME_FLAG.to_string(),
                rendezvous.master_arg(),
            ],
            cwd: run_dir(&master_path, config),
            output: if config.silent_master {
                OutputMode::Discard
            } else {
                OutputMode::Inherit
            },
        };
        log_spawn(config, "master", &spec);
        let handle = self.launcher.spawn(&spec).await?;

        // Let the master bind its port before workers try to connect
        sleep(MASTER_WARMUP).await;
        Ok(handle)
    }

    async fn start_workers(
        &self,
        config: &PoolConfig,
        exe_arg: &str,
        rendezvous: &RendezvousAddr,
    ) -> Result<Vec<WorkerProcess>> {
        let mut workers = Vec::with_capacity(config.num_workers);
        for index in 0..config.num_workers {
            let dir = config.worker_dir(index);
            if self.workspace.exists(&dir) {
                // Stale replica from an earlier run
                self.workspace.remove_tree(&dir).await?;
            }
            self.workspace.copy_tree(&config.template_dir, &dir).await?;

            let spec = SpawnSpec {
                program: exe_arg.to_string(),
                args: vec![
                    config.control_rel_path.clone(),
                    HOSTNAME_FLAG.to_string(),
                    rendezvous.worker_arg(),
                ],
                cwd: run_dir(&dir, config),
                output: OutputMode::Discard,
            };
            log_spawn(config, "worker", &spec);
            let handle = self.launcher.spawn(&spec).await?;
            workers.push(WorkerProcess { dir, handle });
        }
        Ok(workers)
    }

    async fn drain_master(
        &self,
        handle: &mut Box<dyn ProcessHandle>,
        silent: bool,
    ) -> Result<ExitStatusInfo> {
        if silent {
            // Poll instead of blocking so a surrounding harness sees liveness
            loop {
                if let Some(status) = handle.try_wait()? {
                    info!(code = ?status.code, "master exited");
                    return Ok(status);
                }
                info!("master still running");
                sleep(SILENT_MASTER_POLL_INTERVAL).await;
            }
        }

        let status = handle.wait().await?;
        info!(code = ?status.code, "master exited");
        // A few cycles for the workers to end gracefully on their own
        sleep(WORKER_DRAIN_GRACE).await;
        Ok(status)
    }

    /// Bounded best-effort removal: sweep the pending set repeatedly up to
    /// the pass ceiling, then report survivors as warnings, never errors.
    async fn cleanup_worker_dirs(&self, dirs: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut pending = dirs;
        let mut passes = 0;
        while !pending.is_empty() && passes < CLEANUP_MAX_PASSES {
            passes += 1;
            let mut survivors = Vec::new();
            for dir in pending {
                match self.workspace.remove_tree(&dir).await {
                    Ok(()) => debug!(dir = %dir.display(), "removed worker dir"),
                    Err(e) => {
                        debug!(dir = %dir.display(), error = %e, "removal failed, will retry");
                        survivors.push(dir);
                    }
                }
            }
            pending = survivors;
        }

        for dir in &pending {
            warn!(dir = %dir.display(), "unable to remove worker dir");
        }
        pending
    }
}

/// Directory a process is launched from, honoring the optional run subdirectory
fn run_dir(base: &std::path::Path, config: &PoolConfig) -> PathBuf {
    match &config.run_subdir {
        Some(sub) => base.join(sub),
        None => base.to_path_buf(),
    }
}

fn log_spawn(config: &PoolConfig, role: &str, spec: &SpawnSpec) {
    if config.verbose {
        info!(role, command = %spec.command_line(), dir = %spec.cwd.display(), "starting process");
    } else {
        debug!(role, command = %spec.command_line(), dir = %spec.cwd.display(), "starting process");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::port::process_launcher::mocks::{MockBehavior, MockProcessLauncher};
    use crate::port::workspace::mocks::MockWorkspace;
    use std::path::Path;

    fn base_workspace() -> MockWorkspace {
        MockWorkspace::new()
            .with_dir("template")
            .with_dir(".")
            .with_file("template/case.pst", "pcf\n")
    }

    fn base_config(num_workers: usize) -> PoolConfig {
        PoolConfig::new("template", "pestpp", "case.pst", num_workers)
    }

    fn supervisor(
        launcher: MockProcessLauncher,
        workspace: MockWorkspace,
    ) -> (PoolSupervisor, Arc<MockProcessLauncher>, Arc<MockWorkspace>) {
        let launcher = Arc::new(launcher);
        let workspace = Arc::new(workspace);
        (
            PoolSupervisor::new(launcher.clone(), workspace.clone()),
            launcher,
            workspace,
        )
    }

    #[tokio::test]
    async fn spawns_one_process_per_worker_in_distinct_dirs() {
        let (sup, launcher, _) =
            supervisor(MockProcessLauncher::new_exiting(0), base_workspace());

        let outcome = sup.run(&base_config(3)).await.unwrap();

        let spawns = launcher.spawns();
        assert_eq!(spawns.len(), 3);
        for (i, spec) in spawns.iter().enumerate() {
            assert_eq!(spec.cwd, Path::new(".").join(format!("slave_{i}")));
            assert_eq!(
                spec.args,
                vec!["case.pst".to_string(), "/h".to_string(), "localhost:4004".to_string()]
            );
            assert_eq!(spec.output, OutputMode::Discard);
        }
        assert_eq!(outcome.master_exit, None);
        assert!(outcome.leftover_dirs.is_empty());
    }

    #[tokio::test]
    async fn zero_workers_is_a_valid_pool() {
        let (sup, launcher, _) =
            supervisor(MockProcessLauncher::new_exiting(0), base_workspace());

        let outcome = sup.run(&base_config(0)).await.unwrap();

        assert_eq!(launcher.spawn_count(), 0);
        assert!(outcome.worker_dirs.is_empty());
    }

    #[tokio::test]
    async fn missing_template_fails_before_any_spawn() {
        let workspace = MockWorkspace::new().with_dir(".");
        let (sup, launcher, _) = supervisor(MockProcessLauncher::new_exiting(0), workspace);

        let err = sup.run(&base_config(2)).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Domain(DomainError::TemplateNotFound(_))
        ));
        assert_eq!(launcher.spawn_count(), 0);
    }

    #[tokio::test]
    async fn missing_control_file_fails_before_any_spawn() {
        let workspace = MockWorkspace::new().with_dir("template").with_dir(".");
        let (sup, launcher, _) = supervisor(MockProcessLauncher::new_exiting(0), workspace);

        let err = sup.run(&base_config(1)).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Domain(DomainError::ControlFileNotFound(_))
        ));
        assert_eq!(launcher.spawn_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn master_dir_is_replaced_and_gets_port_only_arg() {
        let workspace = base_workspace()
            .with_dir("run_master")
            .with_file("run_master/stale.dat", "old");
        let (sup, launcher, workspace) =
            supervisor(MockProcessLauncher::new_exiting(0), workspace);

        let mut config = base_config(2);
        config.master_dir = Some("run_master".to_string());
        let outcome = sup.run(&config).await.unwrap();

        // Pre-existing dir removed, fresh copy made
        assert!(workspace
            .removed_paths()
            .contains(&PathBuf::from("run_master")));
        assert!(workspace
            .copies()
            .contains(&(PathBuf::from("template"), PathBuf::from("run_master"))));

        // Master is the first spawn and rendezvouses on the bare port
        let spawns = launcher.spawns();
        assert_eq!(spawns.len(), 3);
        assert_eq!(spawns[0].cwd, PathBuf::from("run_master"));
        assert_eq!(spawns[0].args[2], ":4004");
        assert_eq!(spawns[1].args[2], "localhost:4004");
        assert_eq!(outcome.master_exit, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn workers_outliving_the_master_are_terminated() {
        let launcher = MockProcessLauncher::new(MockBehavior::RunUntilTerminated)
            .script(vec![MockBehavior::Exit(0)]);
        let (sup, launcher, _) = supervisor(launcher, base_workspace());

        let mut config = base_config(2);
        config.master_dir = Some("run_master".to_string());
        let outcome = sup.run(&config).await.unwrap();

        assert_eq!(launcher.termination_count(), 2);
        assert_eq!(outcome.master_exit, Some(0));
        assert!(outcome.leftover_dirs.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_master_is_polled_not_waited() {
        let launcher =
            MockProcessLauncher::new_exiting(0).script(vec![MockBehavior::Exit(3)]);
        let (sup, launcher, _) = supervisor(launcher, base_workspace());

        let mut config = base_config(1);
        config.master_dir = Some("run_master".to_string());
        config.silent_master = true;
        let outcome = sup.run(&config).await.unwrap();

        assert_eq!(outcome.master_exit, Some(3));
        assert_eq!(launcher.spawn_count(), 2);
    }

    #[tokio::test]
    async fn stale_worker_dir_is_removed_before_replication() {
        let workspace = base_workspace().with_dir("./slave_0");
        let (sup, _, workspace) =
            supervisor(MockProcessLauncher::new_exiting(0), workspace);

        sup.run(&base_config(1)).await.unwrap();

        // Removed once as stale, once by cleanup
        assert_eq!(workspace.remove_attempts(Path::new("./slave_0")), 2);
    }

    #[tokio::test]
    async fn spawn_failure_is_fatal() {
        let launcher = MockProcessLauncher::new(MockBehavior::FailSpawn("no such exe".into()));
        let (sup, _, _) = supervisor(launcher, base_workspace());

        let err = sup.run(&base_config(1)).await.unwrap_err();
        assert!(matches!(err, AppError::Launch(_)));
    }

    #[tokio::test]
    async fn cleanup_retries_until_removal_succeeds() {
        let workspace = base_workspace().fail_removals("./slave_0", 3);
        let (sup, _, workspace) =
            supervisor(MockProcessLauncher::new_exiting(0), workspace);

        let outcome = sup.run(&base_config(1)).await.unwrap();

        assert!(outcome.leftover_dirs.is_empty());
        assert_eq!(workspace.remove_attempts(Path::new("./slave_0")), 4);
    }

    #[tokio::test]
    async fn cleanup_gives_up_at_the_pass_ceiling() {
        let workspace = base_workspace().fail_removals("./slave_0", usize::MAX);
        let (sup, _, workspace) =
            supervisor(MockProcessLauncher::new_exiting(0), workspace);

        let outcome = sup.run(&base_config(1)).await.unwrap();

        assert_eq!(outcome.leftover_dirs, vec![PathBuf::from("./slave_0")]);
        assert_eq!(
            workspace.remove_attempts(Path::new("./slave_0")),
            CLEANUP_MAX_PASSES
        );
    }

    #[tokio::test]
    async fn no_cleanup_leaves_worker_dirs_in_place() {
        let (sup, _, workspace) =
            supervisor(MockProcessLauncher::new_exiting(0), base_workspace());

        let mut config = base_config(2);
        config.cleanup = false;
        let outcome = sup.run(&config).await.unwrap();

        assert!(outcome.leftover_dirs.is_empty());
        assert!(workspace.is_dir(Path::new("./slave_0")));
        assert!(workspace.is_dir(Path::new("./slave_1")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn local_executable_gets_dot_slash_prefix() {
        let workspace = base_workspace().with_file("template/pestpp", "\x7fELF");
        let (sup, launcher, _) = supervisor(MockProcessLauncher::new_exiting(0), workspace);

        sup.run(&base_config(1)).await.unwrap();

        assert_eq!(launcher.spawns()[0].program, "./pestpp");
    }
}
