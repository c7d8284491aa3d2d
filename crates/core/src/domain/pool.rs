// Worker-pool configuration and run outcome

use std::path::PathBuf;

/// Replica directories are named `slave_<index>` under the worker root
pub const WORKER_DIR_PREFIX: &str = "slave_";

/// Default rendezvous port the estimation executables listen on
pub const DEFAULT_RENDEZVOUS_PORT: u16 = 4004;

/// Directory name for worker `index`, derived deterministically
pub fn worker_dir_name(index: usize) -> String {
    format!("{WORKER_DIR_PREFIX}{index}")
}

/// Configuration for one worker-pool run
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Directory holding the canonical input-file set
    pub template_dir: PathBuf,
    /// Relative path of the estimation executable inside the template
    pub exe_rel_path: String,
    /// Relative path of the control file inside the template
    pub control_rel_path: String,
    /// Number of worker replicas to launch
    pub num_workers: usize,
    /// Root directory the replica directories are created under
    pub worker_root: PathBuf,
    /// Subdirectory inside each replica to launch the process from
    pub run_subdir: Option<String>,
    /// Rendezvous port
    pub port: u16,
    /// Hostname workers connect to; None means localhost
    pub hostname: Option<String>,
    /// Directory name for the master instance; None starts no master
    pub master_dir: Option<String>,
    /// Discard the master's output and poll its status instead of blocking
    pub silent_master: bool,
    /// Remove replica directories once all processes have exited
    pub cleanup: bool,
    /// Log spawned command lines at info level
    pub verbose: bool,
}

impl PoolConfig {
    pub fn new(
        template_dir: impl Into<PathBuf>,
        exe_rel_path: impl Into<String>,
        control_rel_path: impl Into<String>,
        num_workers: usize,
    ) -> Self {
        Self {
            template_dir: template_dir.into(),
            exe_rel_path: exe_rel_path.into(),
            control_rel_path: control_rel_path.into(),
            num_workers,
            worker_root: PathBuf::from("."),
            run_subdir: None,
            port: DEFAULT_RENDEZVOUS_PORT,
            hostname: None,
            master_dir: None,
            silent_master: false,
            cleanup: true,
            verbose: false,
        }
    }

    /// Path of the replica directory for worker `index`
    pub fn worker_dir(&self, index: usize) -> PathBuf {
        self.worker_root.join(worker_dir_name(index))
    }
}

/// What a completed run left behind
#[derive(Debug, Default)]
pub struct PoolOutcome {
    /// Exit code of the master process, when one was started
    pub master_exit: Option<i32>,
    /// Replica directories created for this run
    pub worker_dirs: Vec<PathBuf>,
    /// Directories cleanup could not remove within the retry ceiling
    pub leftover_dirs: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_dirs_are_index_derived() {
        assert_eq!(worker_dir_name(0), "slave_0");
        assert_eq!(worker_dir_name(17), "slave_17");

        let config = PoolConfig::new("template", "pestpp", "case.pst", 2);
        assert_eq!(config.worker_dir(1), PathBuf::from("./slave_1"));
    }
}
