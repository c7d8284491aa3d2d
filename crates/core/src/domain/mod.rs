// Domain Layer - pure types and logic, no IO

pub mod command;
pub mod ensemble;
pub mod error;
pub mod platform;
pub mod pool;
pub mod rendezvous;

// Re-exports
pub use command::rewrite_command_line;
pub use ensemble::{ParameterEnsemble, SweepTable};
pub use error::DomainError;
pub use platform::PlatformFamily;
pub use pool::{
    worker_dir_name, PoolConfig, PoolOutcome, DEFAULT_RENDEZVOUS_PORT, WORKER_DIR_PREFIX,
};
pub use rendezvous::{RendezvousAddr, HOSTNAME_FLAG};
