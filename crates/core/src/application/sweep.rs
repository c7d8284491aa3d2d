// Batch-sweep wrapper around the worker-pool supervisor

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{DomainError, ParameterEnsemble, PoolConfig, SweepTable, DEFAULT_RENDEZVOUS_PORT};
use crate::error::{AppError, Result};
use crate::port::{ProcessLauncher, Workspace};

use super::supervisor::PoolSupervisor;

/// Sweep input file written into the template directory
pub const SWEEP_IN_FILE: &str = "sweep_in.csv";

/// Result table the sweep executable writes into the master directory
pub const SWEEP_OUT_FILE: &str = "sweep_out.csv";

/// Control file written when the caller names none
pub const DEFAULT_SWEEP_CONTROL: &str = "master_runsweep.pst";

/// Default sweep executable name
pub const DEFAULT_SWEEP_EXE: &str = "pestpp-swp";

/// Default master directory name for sweep runs
pub const DEFAULT_MASTER_DIR: &str = "master_runsweep";

/// Configuration for one batch sweep
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Directory holding the canonical input-file set
    pub template_dir: PathBuf,
    /// Control file inside the template; None writes the ensemble's document
    pub control_file: Option<String>,
    /// Number of worker replicas
    pub num_workers: usize,
    /// Sweep executable name
    pub exe_name: String,
    /// Master directory name
    pub master_dir: String,
    /// Root the replica directories are created under
    pub worker_root: PathBuf,
    /// Rendezvous port
    pub port: u16,
    /// Run on this machine; cluster backends are not implemented
    pub local: bool,
    /// Serialize the ensemble in binary form; not implemented
    pub binary: bool,
    /// Remove the master directory after loading the result table
    pub cleanup_master: bool,
}

impl SweepConfig {
    pub fn new(template_dir: impl Into<PathBuf>, num_workers: usize) -> Self {
        Self {
            template_dir: template_dir.into(),
            control_file: None,
            num_workers,
            exe_name: DEFAULT_SWEEP_EXE.to_string(),
            master_dir: DEFAULT_MASTER_DIR.to_string(),
            worker_root: PathBuf::from("."),
            port: DEFAULT_RENDEZVOUS_PORT,
            local: true,
            binary: false,
            cleanup_master: true,
        }
    }
}

/// Writes the sweep inputs, delegates to the supervisor, and loads the
/// result table from the master directory.
pub struct SweepRunner {
    supervisor: PoolSupervisor,
    workspace: Arc<dyn Workspace>,
}

impl SweepRunner {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, workspace: Arc<dyn Workspace>) -> Self {
        Self {
            supervisor: PoolSupervisor::new(launcher, workspace.clone()),
            workspace,
        }
    }

    pub async fn run(
        &self,
        ensemble: &ParameterEnsemble,
        config: &SweepConfig,
    ) -> Result<SweepTable> {
        if config.binary {
            return Err(AppError::Unsupported(
                "binary sweep input is not implemented".into(),
            ));
        }
        if !config.local {
            return Err(AppError::Unsupported(
                "cluster execution backends are not implemented".into(),
            ));
        }

        let control_name = self.resolve_control_file(ensemble, config).await?;

        // Serialize the ensemble next to the rest of the template inputs
        let mut buf = Vec::new();
        ensemble.write_csv(&mut buf)?;
        let sweep_in = config.template_dir.join(SWEEP_IN_FILE);
        let contents = String::from_utf8(buf)
            .map_err(|e| AppError::Internal(format!("ensemble serialization: {e}")))?;
        self.workspace.write_file(&sweep_in, &contents).await?;
        info!(path = %sweep_in.display(), rows = ensemble.len(), "wrote sweep input");

        let mut pool = PoolConfig::new(
            config.template_dir.clone(),
            config.exe_name.clone(),
            control_name,
            config.num_workers,
        );
        pool.worker_root = config.worker_root.clone();
        pool.port = config.port;
        pool.master_dir = Some(config.master_dir.clone());
        self.supervisor.run(&pool).await?;

        let out_path = PathBuf::from(&config.master_dir).join(SWEEP_OUT_FILE);
        if !self.workspace.exists(&out_path) {
            return Err(AppError::NotFound(format!(
                "sweep output {} was not produced",
                out_path.display()
            )));
        }
        let text = self.workspace.read_to_string(&out_path).await?;
        let table = SweepTable::read_csv(text.as_bytes())?;
        info!(rows = table.len(), "loaded sweep results");

        if config.cleanup_master {
            let master_path = PathBuf::from(&config.master_dir);
            if let Err(e) = self.workspace.remove_tree(&master_path).await {
                warn!(dir = %master_path.display(), error = %e, "unable to remove master dir");
            }
        }
        Ok(table)
    }

    /// Either verify the named control file or write the ensemble's own
    /// control document under the default name.
    async fn resolve_control_file(
        &self,
        ensemble: &ParameterEnsemble,
        config: &SweepConfig,
    ) -> Result<String> {
        match &config.control_file {
            Some(name) => {
                let path = config.template_dir.join(name);
                if !self.workspace.exists(&path) {
                    return Err(DomainError::ControlFileNotFound(path).into());
                }
                Ok(name.clone())
            }
            None => {
                let document = ensemble.control().ok_or_else(|| {
                    AppError::Validation(
                        "no control file named and the ensemble carries no control document"
                            .into(),
                    )
                })?;
                let path = config.template_dir.join(DEFAULT_SWEEP_CONTROL);
                self.workspace.write_file(&path, document).await?;
                info!(path = %path.display(), "wrote default control file");
                Ok(DEFAULT_SWEEP_CONTROL.to_string())
            }
        }
    }
}
