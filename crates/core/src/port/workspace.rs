// Workspace Port
// Abstraction for the filesystem tree the pool runs in

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Workspace errors, always carrying the paths involved
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("unable to copy {} to {}: {reason}", .src.display(), .dst.display())]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        reason: String,
    },

    #[error("unable to remove {}: {reason}", .path.display())]
    Remove { path: PathBuf, reason: String },

    #[error("unable to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("unable to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

/// Filesystem operations the supervisor and sweep wrapper need
///
/// Implementations:
/// - StdWorkspace: real filesystem (infra-system)
/// - mocks::MockWorkspace: in-memory tree for tests
#[async_trait]
pub trait Workspace: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Replicate a directory tree verbatim
    async fn copy_tree(&self, src: &Path, dst: &Path) -> Result<(), WorkspaceError>;

    /// Remove a directory tree, clearing read-only bits when removal is denied
    async fn remove_tree(&self, path: &Path) -> Result<(), WorkspaceError>;

    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), WorkspaceError>;

    async fn read_to_string(&self, path: &Path) -> Result<String, WorkspaceError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory workspace for testing
    ///
    /// Directories and files are plain path sets; removal failures can be
    /// scripted per path to exercise the cleanup retry loop.
    #[derive(Default)]
    pub struct MockWorkspace {
        dirs: Mutex<HashSet<PathBuf>>,
        files: Mutex<HashMap<PathBuf, String>>,
        remove_failures: Mutex<HashMap<PathBuf, usize>>,
        remove_attempts: Mutex<HashMap<PathBuf, usize>>,
        removed: Mutex<Vec<PathBuf>>,
        copies: Mutex<Vec<(PathBuf, PathBuf)>>,
    }

    impl MockWorkspace {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
            self.dirs.lock().unwrap().insert(path.into());
            self
        }

        pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
            self.files.lock().unwrap().insert(path.into(), contents.into());
            self
        }

        /// Make `remove_tree` fail `count` times for `path` before succeeding
        pub fn fail_removals(self, path: impl Into<PathBuf>, count: usize) -> Self {
            self.remove_failures.lock().unwrap().insert(path.into(), count);
            self
        }

        pub fn remove_attempts(&self, path: &Path) -> usize {
            self.remove_attempts
                .lock()
                .unwrap()
                .get(path)
                .copied()
                .unwrap_or(0)
        }

        pub fn removed_paths(&self) -> Vec<PathBuf> {
            self.removed.lock().unwrap().clone()
        }

        pub fn copies(&self) -> Vec<(PathBuf, PathBuf)> {
            self.copies.lock().unwrap().clone()
        }

        pub fn file_contents(&self, path: &Path) -> Option<String> {
            self.files.lock().unwrap().get(path).cloned()
        }
    }

    #[async_trait]
    impl Workspace for MockWorkspace {
        fn exists(&self, path: &Path) -> bool {
            self.dirs.lock().unwrap().contains(path)
                || self.files.lock().unwrap().contains_key(path)
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.dirs.lock().unwrap().contains(path)
        }

        async fn copy_tree(&self, src: &Path, dst: &Path) -> Result<(), WorkspaceError> {
            if !self.is_dir(src) {
                return Err(WorkspaceError::Copy {
                    src: src.to_path_buf(),
                    dst: dst.to_path_buf(),
                    reason: "source does not exist".into(),
                });
            }
            self.dirs.lock().unwrap().insert(dst.to_path_buf());
            self.copies
                .lock()
                .unwrap()
                .push((src.to_path_buf(), dst.to_path_buf()));
            Ok(())
        }

        async fn remove_tree(&self, path: &Path) -> Result<(), WorkspaceError> {
            *self
                .remove_attempts
                .lock()
                .unwrap()
                .entry(path.to_path_buf())
                .or_insert(0) += 1;

            let mut failures = self.remove_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(path) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(WorkspaceError::Remove {
                        path: path.to_path_buf(),
                        reason: "scripted failure".into(),
                    });
                }
            }
            drop(failures);

            self.dirs.lock().unwrap().remove(path);
            self.files
                .lock()
                .unwrap()
                .retain(|p, _| !p.starts_with(path));
            self.removed.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        async fn write_file(&self, path: &Path, contents: &str) -> Result<(), WorkspaceError> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }

        async fn read_to_string(&self, path: &Path) -> Result<String, WorkspaceError> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| WorkspaceError::Read {
                    path: path.to_path_buf(),
                    reason: "no such file".into(),
                })
        }
    }
}
