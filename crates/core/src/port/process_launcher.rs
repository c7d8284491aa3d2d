// Process Launcher Port
// Abstraction for spawning and supervising external estimation processes

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// What to do with a child's stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Let the child write to the launcher's own streams
    Inherit,
    /// Route the child's streams to the null device
    Discard,
}

/// Everything needed to start one child process.
///
/// The working directory is explicit per spawn; implementations must never
/// change the launcher's own global working directory.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub output: OutputMode,
}

impl SpawnSpec {
    /// Render the command line for logging
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Exit status of a supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatusInfo {
    pub code: Option<i32>,
    pub success: bool,
}

/// Launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("failed to spawn {program} in {}: {reason}", .cwd.display())]
    SpawnFailed {
        program: String,
        cwd: PathBuf,
        reason: String,
    },

    #[error("failed waiting on process: {0}")]
    WaitFailed(String),

    #[error("failed to terminate process: {0}")]
    TerminateFailed(String),
}

/// Handle to one live child process
#[async_trait]
pub trait ProcessHandle: Send {
    /// Block until the process exits
    async fn wait(&mut self) -> Result<ExitStatusInfo, LaunchError>;

    /// Non-blocking status check; `None` while still running
    fn try_wait(&mut self) -> Result<Option<ExitStatusInfo>, LaunchError>;

    /// Terminate the process, gracefully where the platform allows it
    async fn terminate(&mut self) -> Result<(), LaunchError>;
}

/// Process launcher trait
///
/// Implementations:
/// - TokioProcessLauncher: spawns real OS processes (infra-system)
/// - mocks::MockProcessLauncher: scripted processes for tests
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start a process and return its handle
    ///
    /// # Errors
    /// - LaunchError::SpawnFailed if the process cannot be started
    async fn spawn(&self, spec: &SpawnSpec) -> Result<Box<dyn ProcessHandle>, LaunchError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Scripted behavior for one mock process
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit on the first wait with this code
        Exit(i32),
        /// Keep running until terminated
        RunUntilTerminated,
        /// Fail the spawn itself
        FailSpawn(String),
    }

    /// Mock process launcher for testing
    ///
    /// Behaviors are consumed in spawn order; once the script runs out,
    /// `default_behavior` applies to every further spawn.
    pub struct MockProcessLauncher {
        scripted: Mutex<Vec<MockBehavior>>,
        default_behavior: MockBehavior,
        spawns: Mutex<Vec<SpawnSpec>>,
        terminations: Arc<AtomicUsize>,
    }

    impl MockProcessLauncher {
        pub fn new(default_behavior: MockBehavior) -> Self {
            Self {
                scripted: Mutex::new(Vec::new()),
                default_behavior,
                spawns: Mutex::new(Vec::new()),
                terminations: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn new_exiting(code: i32) -> Self {
            Self::new(MockBehavior::Exit(code))
        }

        /// Queue behaviors consumed by the next spawns, in order
        pub fn script(self, behaviors: Vec<MockBehavior>) -> Self {
            *self.scripted.lock().unwrap() = behaviors;
            self
        }

        pub fn spawn_count(&self) -> usize {
            self.spawns.lock().unwrap().len()
        }

        pub fn spawns(&self) -> Vec<SpawnSpec> {
            self.spawns.lock().unwrap().clone()
        }

        pub fn termination_count(&self) -> usize {
            self.terminations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProcessLauncher for MockProcessLauncher {
        async fn spawn(&self, spec: &SpawnSpec) -> Result<Box<dyn ProcessHandle>, LaunchError> {
            let behavior = {
                let mut scripted = self.scripted.lock().unwrap();
                if scripted.is_empty() {
                    self.default_behavior.clone()
                } else {
                    scripted.remove(0)
                }
            };

            if let MockBehavior::FailSpawn(reason) = &behavior {
                return Err(LaunchError::SpawnFailed {
                    program: spec.program.clone(),
                    cwd: spec.cwd.clone(),
                    reason: reason.clone(),
                });
            }

            self.spawns.lock().unwrap().push(spec.clone());
            Ok(Box::new(MockProcessHandle {
                behavior,
                terminated: Arc::new(AtomicBool::new(false)),
                terminations: Arc::clone(&self.terminations),
            }))
        }
    }

    pub struct MockProcessHandle {
        behavior: MockBehavior,
        terminated: Arc<AtomicBool>,
        terminations: Arc<AtomicUsize>,
    }

    impl MockProcessHandle {
        fn exit_status(&self) -> ExitStatusInfo {
            match &self.behavior {
                MockBehavior::Exit(code) => ExitStatusInfo {
                    code: Some(*code),
                    success: *code == 0,
                },
                // A terminated process reports a signal-style failure
                _ => ExitStatusInfo {
                    code: None,
                    success: false,
                },
            }
        }
    }

    #[async_trait]
    impl ProcessHandle for MockProcessHandle {
        async fn wait(&mut self) -> Result<ExitStatusInfo, LaunchError> {
            match self.behavior {
                MockBehavior::Exit(_) => Ok(self.exit_status()),
                _ => loop {
                    if self.terminated.load(Ordering::SeqCst) {
                        return Ok(self.exit_status());
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                },
            }
        }

        fn try_wait(&mut self) -> Result<Option<ExitStatusInfo>, LaunchError> {
            match self.behavior {
                MockBehavior::Exit(_) => Ok(Some(self.exit_status())),
                _ if self.terminated.load(Ordering::SeqCst) => Ok(Some(self.exit_status())),
                _ => Ok(None),
            }
        }

        async fn terminate(&mut self) -> Result<(), LaunchError> {
            self.terminated.store(true, Ordering::SeqCst);
            self.terminations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
