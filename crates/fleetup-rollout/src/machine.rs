//! Per-router transition functions for the download and upgrade phases.
//!
//! These functions only look at one router's observed state and return a
//! decision. Requests, status writes, sleeps, and timeouts are the
//! controller's job.

use std::fmt;

use fleetup_conductor::{AssetSnapshot, ConductorResult};
use fleetup_core::{NodeStatus, SubStatus, unified_release};

use crate::catalog::resolve_target;

/// The two polling phases of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Getting the target release onto every router.
    Download,
    /// Switching every router over to the target release.
    Upgrade,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Download => f.write_str("download"),
            Phase::Upgrade => f.write_str("upgrade"),
        }
    }
}

/// One router as seen in a single asset snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterView {
    /// One entry per node; empty when the router has no asset.
    pub statuses: Vec<SubStatus>,
    /// Unified running release per node.
    pub running: Vec<Option<String>>,
    /// Releases downloaded on every node.
    pub downloaded: Vec<String>,
    /// Releases offered for download.
    pub available: Vec<String>,
}

impl RouterView {
    pub fn capture(snapshot: &AssetSnapshot, router: &str) -> ConductorResult<Self> {
        Ok(Self {
            statuses: snapshot.status_of(router)?,
            running: snapshot.node_releases(router),
            downloaded: snapshot.downloaded(router),
            available: snapshot.available(router),
        })
    }

    fn any(&self, status: NodeStatus) -> bool {
        self.statuses.iter().any(|s| s.status == status)
    }

    /// Non-empty and every node in `status`.
    fn all(&self, status: NodeStatus) -> bool {
        !self.statuses.is_empty() && self.statuses.iter().all(|s| s.status == status)
    }

    /// Every node runs `unified_target`.
    pub fn runs(&self, unified_target: &str) -> bool {
        !self.running.is_empty()
            && self
                .running
                .iter()
                .all(|r| r.as_deref() == Some(unified_target))
    }

    pub fn has_downloaded(&self, unified_target: &str) -> bool {
        self.downloaded
            .iter()
            .any(|r| unified_release(r) == unified_target)
    }

    pub fn is_stable(&self) -> bool {
        !self.statuses.is_empty() && self.statuses.iter().all(|s| s.status.is_stable())
    }

    /// Status details joined for log output.
    pub fn details(&self) -> String {
        self.statuses
            .iter()
            .filter(|s| !s.detail.is_empty())
            .map(|s| s.detail.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Target release in both forms the transitions need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// As requested; used as prefix when resolving an installable release.
    pub requested: String,
    pub unified: String,
}

impl Target {
    pub fn new(requested: &str) -> Self {
        Self {
            requested: requested.to_string(),
            unified: unified_release(requested),
        }
    }
}

/// Download phase decision for one router in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStep {
    /// An upgrade is already running. Handled, not blocking.
    Upgrading,
    /// A download is running on at least one node.
    Downloading,
    /// The target is already present on every node.
    Downloaded,
    /// Nothing offered to the router matches the target.
    NotPossible,
    /// Ask the conductor to download `release`.
    Request { release: String },
}

pub fn download_step(view: &RouterView, target: &Target) -> DownloadStep {
    if view.any(NodeStatus::Upgrading) {
        return DownloadStep::Upgrading;
    }
    if view.any(NodeStatus::Downloading) {
        return DownloadStep::Downloading;
    }
    if view.has_downloaded(&target.unified) {
        return DownloadStep::Downloaded;
    }
    match resolve_target(&view.available, &target.requested) {
        Some(release) => DownloadStep::Request {
            release: release.to_string(),
        },
        None => DownloadStep::NotPossible,
    }
}

/// Upgrade phase decision for one router in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeStep {
    /// An upgrade is running on at least one node.
    Upgrading,
    /// At target, but not every node is stable yet.
    AwaitingStable,
    /// At target; stop tracking.
    Completed,
    /// Every node is RUNNING an older release: ask for the upgrade.
    Request { release: String },
    /// Every node is RUNNING but nothing offered matches the target.
    Unavailable,
    /// Every node is DISCONNECTED.
    Disconnected,
    /// Any other combination of node states.
    Waiting,
}

pub fn upgrade_step(view: &RouterView, target: &Target, wait_for_stable: bool) -> UpgradeStep {
    if view.any(NodeStatus::Upgrading) {
        return UpgradeStep::Upgrading;
    }
    if view.runs(&target.unified) {
        if wait_for_stable && !view.is_stable() {
            return UpgradeStep::AwaitingStable;
        }
        return UpgradeStep::Completed;
    }
    if view.all(NodeStatus::Running) {
        return match resolve_target(&view.available, &target.requested) {
            Some(release) => UpgradeStep::Request {
                release: release.to_string(),
            },
            None => UpgradeStep::Unavailable,
        };
    }
    if view.all(NodeStatus::Disconnected) {
        return UpgradeStep::Disconnected;
    }
    UpgradeStep::Waiting
}
