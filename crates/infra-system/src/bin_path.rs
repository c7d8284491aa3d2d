// Search-path registration for prebuilt estimation binaries

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use pestpool_core::domain::platform::host_bin_subdir;

/// The per-platform binary directory under `root` (`linux`, `mac` or `win`)
pub fn platform_bin_dir(root: &Path) -> PathBuf {
    root.join(host_bin_subdir())
}

/// Append the platform binary directory under `root` to this process's
/// PATH so spawned estimation executables resolve by bare name.
pub fn register_bin_dir(root: &Path) -> io::Result<PathBuf> {
    let dir = platform_bin_dir(root);
    let mut paths: Vec<PathBuf> =
        env::split_paths(&env::var_os("PATH").unwrap_or_default()).collect();
    if !paths.contains(&dir) {
        paths.push(dir.clone());
        let joined = env::join_paths(paths)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        env::set_var("PATH", joined);
    }
    info!(dir = %dir.display(), "registered binary dir on PATH");
    Ok(dir)
}
