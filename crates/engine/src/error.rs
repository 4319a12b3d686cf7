//! Error types for the engine crate.

use std::path::PathBuf;

use thiserror::Error;

/// Engine error type covering every way a browse or file request can fail.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request path resolves outside the confined root.
    #[error("path escapes the shared root: {0}")]
    Confinement(String),

    /// The resolved path does not exist.
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    /// A directory operation was requested on something that is not a directory.
    #[error("path is not a directory: {0}")]
    NotDirectory(PathBuf),

    /// A file operation was requested on a directory.
    #[error("path is a directory: {0}")]
    IsDirectory(PathBuf),

    /// Underlying read or enumeration failure.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
}

impl EngineError {
    /// HTTP status code the front end should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Confinement(_) => 403,
            EngineError::NotFound(_) => 404,
            EngineError::NotDirectory(_) | EngineError::IsDirectory(_) => 400,
            EngineError::Io(_) => 500,
        }
    }

    /// Classify an IO error raised while touching `path`.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => EngineError::NotFound(path.into()),
            std::io::ErrorKind::NotADirectory => EngineError::NotDirectory(path.into()),
            _ => EngineError::Io(err),
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
