//! End-to-end pool lifecycle against real processes and a real filesystem.
//!
//! The estimation executable is stood in for by a small shell script, so
//! these tests are Unix-only.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pestpool_core::application::PoolSupervisor;
use pestpool_core::domain::PoolConfig;
use pestpool_infra_system::{StdWorkspace, TokioProcessLauncher};

const EXE_NAME: &str = "worker.sh";
const CONTROL_NAME: &str = "case.pst";

/// Script distinguishing the master (bare `:port` rendezvous) from workers
const POOL_SCRIPT: &str = "#!/bin/sh\ncase \"$3\" in\n  :*) sleep 0.2 ;;\n  *) sleep 60 ;;\nesac\n";

/// Script that exits immediately in every role
const QUICK_SCRIPT: &str = "#!/bin/sh\nexit 0\n";

fn write_template(root: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let template = root.join("template");
    fs::create_dir_all(template.join("data")).unwrap();
    fs::write(template.join(CONTROL_NAME), "pcf\n* control data\n").unwrap();
    fs::write(template.join("data/obs.dat"), "1.0 2.0\n").unwrap();

    let exe = template.join(EXE_NAME);
    fs::write(&exe, script).unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
    template
}

fn config(template: PathBuf, root: &Path, num_workers: usize) -> PoolConfig {
    let mut config = PoolConfig::new(template, EXE_NAME, CONTROL_NAME, num_workers);
    config.worker_root = root.to_path_buf();
    config
}

fn supervisor() -> PoolSupervisor {
    PoolSupervisor::new(Arc::new(TokioProcessLauncher), Arc::new(StdWorkspace))
}

fn leftover_worker_dirs(root: &Path) -> Vec<PathBuf> {
    fs::read_dir(root)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("slave_"))
        })
        .collect()
}

#[tokio::test]
async fn run_with_cleanup_leaves_no_worker_dirs() {
    let tmp = tempfile::tempdir().unwrap();
    let template = write_template(tmp.path(), QUICK_SCRIPT);

    let outcome = supervisor()
        .run(&config(template, tmp.path(), 3))
        .await
        .unwrap();

    assert_eq!(outcome.worker_dirs.len(), 3);
    assert!(outcome.leftover_dirs.is_empty());
    assert!(leftover_worker_dirs(tmp.path()).is_empty());
}

#[tokio::test]
async fn run_without_cleanup_keeps_replicated_trees() {
    let tmp = tempfile::tempdir().unwrap();
    let template = write_template(tmp.path(), QUICK_SCRIPT);

    let mut config = config(template, tmp.path(), 2);
    config.cleanup = false;
    supervisor().run(&config).await.unwrap();

    let dirs = leftover_worker_dirs(tmp.path());
    assert_eq!(dirs.len(), 2);
    for dir in dirs {
        // Replicas carry the full template tree
        assert!(dir.join(CONTROL_NAME).exists());
        assert!(dir.join("data/obs.dat").exists());
    }
}

#[tokio::test]
async fn missing_template_fails_without_touching_the_root() {
    let tmp = tempfile::tempdir().unwrap();

    let result = supervisor()
        .run(&config(tmp.path().join("nope"), tmp.path(), 2))
        .await;

    assert!(result.is_err());
    assert!(leftover_worker_dirs(tmp.path()).is_empty());
}

#[tokio::test]
async fn master_exit_terminates_lingering_workers() {
    let tmp = tempfile::tempdir().unwrap();
    let template = write_template(tmp.path(), POOL_SCRIPT);

    let mut config = config(template, tmp.path(), 2);
    config.master_dir = Some(tmp.path().join("master").to_string_lossy().into_owned());

    let started = std::time::Instant::now();
    let outcome = supervisor().run(&config).await.unwrap();

    // Workers sleep 60s; finishing early means they were killed
    assert!(started.elapsed().as_secs() < 30);
    assert_eq!(outcome.master_exit, Some(0));
    assert!(outcome.leftover_dirs.is_empty());
    assert!(leftover_worker_dirs(tmp.path()).is_empty());
}

#[tokio::test]
async fn preexisting_master_dir_is_replaced() {
    let tmp = tempfile::tempdir().unwrap();
    let template = write_template(tmp.path(), QUICK_SCRIPT);

    let master = tmp.path().join("master");
    fs::create_dir_all(&master).unwrap();
    fs::write(master.join("stale.dat"), "old run").unwrap();

    let mut config = config(template, tmp.path(), 1);
    config.master_dir = Some(master.to_string_lossy().into_owned());
    supervisor().run(&config).await.unwrap();

    // Fresh copy of the template, stale content gone
    assert!(master.join(CONTROL_NAME).exists());
    assert!(!master.join("stale.dat").exists());
}
