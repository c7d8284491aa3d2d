// Workspace implementation over the real filesystem

use std::fs;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use pestpool_core::port::{Workspace, WorkspaceError};

/// Real-filesystem workspace
pub struct StdWorkspace;

#[async_trait]
impl Workspace for StdWorkspace {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    async fn copy_tree(&self, src: &Path, dst: &Path) -> Result<(), WorkspaceError> {
        copy_dir_recursive(src, dst).map_err(|e| WorkspaceError::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn remove_tree(&self, path: &Path) -> Result<(), WorkspaceError> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(first) => {
                // Read-only entries make removal fail on some platforms;
                // clear the bits and try once more
                debug!(path = %path.display(), error = %first, "removal denied, clearing read-only bits");
                clear_readonly_recursive(path).ok();
                fs::remove_dir_all(path).map_err(|e| WorkspaceError::Remove {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), WorkspaceError> {
        fs::write(path, contents).map_err(|e| WorkspaceError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, WorkspaceError> {
        fs::read_to_string(path).map_err(|e| WorkspaceError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Copy a directory tree verbatim, creating `dst` and its parents
fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Make every entry under `path` writable again
fn clear_readonly_recursive(path: &Path) -> io::Result<()> {
    let metadata = fs::metadata(path)?;
    let mut perms = metadata.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Directories additionally need the owner-write and traverse bits
        let mode = fs::metadata(path)?.permissions().mode();
        if metadata.is_dir() && mode & 0o300 != 0o300 {
            fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o300))?;
        }
    }
    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            clear_readonly_recursive(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_nested_trees_verbatim() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("template");
        fs::create_dir_all(src.join("data")).unwrap();
        fs::write(src.join("case.pst"), "pcf\n").unwrap();
        fs::write(src.join("data/obs.dat"), "1 2 3\n").unwrap();

        let dst = root.path().join("slave_0");
        StdWorkspace.copy_tree(&src, &dst).await.unwrap();

        assert_eq!(fs::read_to_string(dst.join("case.pst")).unwrap(), "pcf\n");
        assert_eq!(
            fs::read_to_string(dst.join("data/obs.dat")).unwrap(),
            "1 2 3\n"
        );
    }

    #[tokio::test]
    async fn copy_from_missing_source_carries_both_paths() {
        let root = tempfile::tempdir().unwrap();
        let err = StdWorkspace
            .copy_tree(&root.path().join("nope"), &root.path().join("dst"))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nope"));
        assert!(message.contains("dst"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn removes_read_only_trees() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("slave_0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("locked.dat"), "x").unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        StdWorkspace.remove_tree(&dir).await.unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn remove_missing_tree_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let err = StdWorkspace
            .remove_tree(&root.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Remove { .. }));
    }
}
