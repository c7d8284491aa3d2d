// Pestpool Core - Domain Logic & Ports
// NO infrastructure dependencies: process spawning and filesystem access live behind ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
