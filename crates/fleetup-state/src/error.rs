//! Error types for rollout status persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for status persistence.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading or writing the status file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to write status file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read status file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed status file line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}
