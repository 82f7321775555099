//! Centralized error types for mhtconv.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mhtconv library.
#[derive(Error, Debug)]
pub enum MhtmlError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("MHTML file not found: {0}")]
    FileNotFound(PathBuf),

    /// The input is not a usable MIME multipart container
    /// (no boundary, no parts, or no `text/html` part).
    #[error("Malformed MHTML container: {0}")]
    MalformedContainer(String),

    /// An export operation failed.
    #[error("Export error: {0}")]
    ExportError(String),

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, MhtmlError>`.
pub type Result<T> = std::result::Result<T, MhtmlError>;

/// Helper to convert a bare `std::io::Error` together with a path.
impl MhtmlError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MhtmlError`
/// when no path context is available (rare, prefer `MhtmlError::io`).
impl From<std::io::Error> for MhtmlError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

/// Failure of a whole conversion run.
///
/// Wraps the first hard failure raised by a pipeline stage. Only container
/// parsing can fail; every later stage degrades instead.
#[derive(Error, Debug)]
#[error("Conversion failed: {0}")]
pub struct ConversionError(#[from] pub MhtmlError);
