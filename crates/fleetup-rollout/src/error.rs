//! Rollout error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use fleetup_conductor::ConductorError;
use fleetup_core::ReleaseError;

use crate::machine::Phase;

pub type RolloutResult<T> = Result<T, RolloutError>;

/// Every variant aborts the run.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("filter {0:?} is incorrect, expected key=value")]
    InvalidFilter(String),

    #[error("unknown filter key {0:?}")]
    UnknownFilterKey(String),

    #[error("could not find matching routers to upgrade")]
    NoRoutersSelected,

    #[error("release {0} is not available on the conductor")]
    ReleaseNotInCatalog(String),

    #[error("release {target} is not available on router {router}")]
    ReleaseUnavailable { router: String, target: String },

    #[error("{phase} of current chunk took longer than {} seconds", .after.as_secs())]
    PhaseTimeout { phase: Phase, after: Duration },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Conductor(#[from] ConductorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_phase_and_seconds() {
        let err = RolloutError::PhaseTimeout {
            phase: Phase::Download,
            after: Duration::from_secs(3600),
        };
        assert_eq!(
            err.to_string(),
            "download of current chunk took longer than 3600 seconds"
        );
    }

    #[test]
    fn release_unavailable_names_router() {
        let err = RolloutError::ReleaseUnavailable {
            router: "branch-1".into(),
            target: "5.5.2".into(),
        };
        assert_eq!(
            err.to_string(),
            "release 5.5.2 is not available on router branch-1"
        );
    }

    #[test]
    fn conductor_errors_convert() {
        let err: RolloutError = ConductorError::InvalidResponse("empty body".into()).into();
        assert!(matches!(err, RolloutError::Conductor(_)));
    }
}
