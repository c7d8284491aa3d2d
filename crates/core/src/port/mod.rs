// Port Layer - Interfaces for external dependencies

pub mod process_launcher;
pub mod workspace;

// Re-exports
pub use process_launcher::{
    ExitStatusInfo, LaunchError, OutputMode, ProcessHandle, ProcessLauncher, SpawnSpec,
};
pub use workspace::{Workspace, WorkspaceError};
