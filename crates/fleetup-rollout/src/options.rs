//! Rollout options: batch size, caps, phase timeouts, and mode switches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed wait between two poll cycles of a phase.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default upgrade timeout; the download timeout falls back to it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// How to roll a release out across the selected routers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutOptions {
    /// Target release as given by the operator, full (`5.5.2-1.el7`) or
    /// unified (`5.5.2`).
    pub target: String,
    /// Routers per chunk. 0 puts every selected router in one chunk.
    pub parallelism: usize,
    /// Only the first `max_routers` selected routers are ever examined.
    pub max_routers: Option<usize>,
    pub download_timeout: Duration,
    pub upgrade_timeout: Duration,
    pub poll_interval: Duration,
    /// Observe and log, never issue a download or upgrade request.
    pub dry_run: bool,
    /// Stop each chunk after its download phase.
    pub download_only: bool,
    /// Upgraded routers only count once every node is RUNNING or
    /// RESYNCHRONIZING.
    pub wait_for_stable: bool,
    /// Drop routers that cannot download or finish in time instead of
    /// aborting the run.
    pub ignore_download_errors: bool,
}

impl RolloutOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Whether chunks continue into the upgrade phase.
    pub fn runs_upgrade(&self) -> bool {
        !self.download_only && !self.dry_run
    }
}

impl Default for RolloutOptions {
    fn default() -> Self {
        Self {
            target: String::new(),
            parallelism: 1,
            max_routers: None,
            download_timeout: DEFAULT_TIMEOUT,
            upgrade_timeout: DEFAULT_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            dry_run: false,
            download_only: false,
            wait_for_stable: false,
            ignore_download_errors: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = RolloutOptions::new("5.5.2");
        assert_eq!(options.target, "5.5.2");
        assert_eq!(options.parallelism, 1);
        assert_eq!(options.upgrade_timeout, Duration::from_secs(3600));
        assert_eq!(options.download_timeout, options.upgrade_timeout);
        assert_eq!(options.poll_interval, Duration::from_secs(30));
        assert!(options.runs_upgrade());
    }

    #[test]
    fn dry_run_and_download_only_skip_upgrade() {
        let dry = RolloutOptions {
            dry_run: true,
            ..RolloutOptions::new("5.5.2")
        };
        assert!(!dry.runs_upgrade());

        let download_only = RolloutOptions {
            download_only: true,
            ..RolloutOptions::new("5.5.2")
        };
        assert!(!download_only.runs_upgrade());
    }

    #[test]
    fn serializes_roundtrip() {
        let options = RolloutOptions {
            parallelism: 4,
            max_routers: Some(10),
            ..RolloutOptions::new("5.5.2")
        };
        let json = serde_json::to_string(&options).unwrap();
        let back: RolloutOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
