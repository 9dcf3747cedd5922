//! Error types for conductor calls.

use std::path::PathBuf;

use fleetup_core::StatusParseError;
use thiserror::Error;

/// Result type alias for conductor operations.
pub type ConductorResult<T> = Result<T, ConductorError>;

/// Errors surfaced by the conductor client.
#[derive(Debug, Error)]
pub enum ConductorError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("conductor returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("router {router} reported {count} status entries, at most 2 expected")]
    TooManyStatuses { router: String, count: usize },

    #[error("router {router}: {source}")]
    UnrecognizedStatus {
        router: String,
        #[source]
        source: StatusParseError,
    },

    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
