// Domain Error Types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("template directory not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("worker root directory not found: {}", .0.display())]
    WorkerRootNotFound(PathBuf),

    #[error("control file not found: {}", .0.display())]
    ControlFileNotFound(PathBuf),

    #[error("empty command line")]
    EmptyCommandLine,

    #[error("row has {got} values, expected {expected}")]
    ColumnCountMismatch { expected: usize, got: usize },

    #[error("validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
