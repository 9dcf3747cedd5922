//! Shared types used across fleetup crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique router name within a conductor's fleet.
pub type RouterName = String;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatusParseError {
    #[error("unrecognized node status: {0:?}")]
    UnknownNodeStatus(String),
    #[error("unrecognized rollout status: {0:?}")]
    UnknownRolloutStatus(String),
}

// ── Node status ───────────────────────────────────────────────────

/// Coarse status of one router node as reported by the conductor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// Provisioned, waiting for the node to come up.
    Pending,
    /// Node has started its initial setup.
    Initialized,
    /// Connected to the conductor, not yet running.
    Connected,
    /// Software is being installed.
    Installing,
    /// Software installed, node not yet started.
    Installed,
    /// Running, catching up on configuration state.
    Resynchronizing,
    /// Up and in service.
    Running,
    /// Fetching a release, or refreshing its release list.
    Downloading,
    /// Switching to a new release.
    Upgrading,
    /// Lost its connection to the conductor.
    Disconnected,
    /// Never connected to the conductor.
    NotConnected,
    /// Install or upgrade failed.
    Failed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "PENDING",
            NodeStatus::Initialized => "INITIALIZED",
            NodeStatus::Connected => "CONNECTED",
            NodeStatus::Installing => "INSTALLING",
            NodeStatus::Installed => "INSTALLED",
            NodeStatus::Resynchronizing => "RESYNCHRONIZING",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Downloading => "DOWNLOADING",
            NodeStatus::Upgrading => "UPGRADING",
            NodeStatus::Disconnected => "DISCONNECTED",
            NodeStatus::NotConnected => "NOT_CONNECTED",
            NodeStatus::Failed => "FAILED",
        }
    }

    /// States a freshly upgraded node may settle in.
    pub fn is_stable(&self) -> bool {
        matches!(self, NodeStatus::Running | NodeStatus::Resynchronizing)
    }
}

impl FromStr for NodeStatus {
    type Err = StatusParseError;

    /// Case-insensitive; `not-connected` and `NOT_CONNECTED` are the same.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        let status = match normalized.as_str() {
            "PENDING" => NodeStatus::Pending,
            "INITIALIZED" => NodeStatus::Initialized,
            "CONNECTED" => NodeStatus::Connected,
            "INSTALLING" => NodeStatus::Installing,
            "INSTALLED" => NodeStatus::Installed,
            "RESYNCHRONIZING" => NodeStatus::Resynchronizing,
            "RUNNING" => NodeStatus::Running,
            "DOWNLOADING" => NodeStatus::Downloading,
            "UPGRADING" => NodeStatus::Upgrading,
            "DISCONNECTED" => NodeStatus::Disconnected,
            "NOT_CONNECTED" => NodeStatus::NotConnected,
            "FAILED" => NodeStatus::Failed,
            _ => return Err(StatusParseError::UnknownNodeStatus(s.to_string())),
        };
        Ok(status)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a router's status list. An HA router reports one per node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubStatus {
    pub status: NodeStatus,
    /// Free-text detail from the conductor (progress, error text).
    pub detail: String,
}

impl SubStatus {
    pub fn new(status: NodeStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

// ── Asset ─────────────────────────────────────────────────────────

/// Per-node software snapshot of a router.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterAsset {
    pub router: RouterName,
    pub node: String,
    /// Release currently running, as reported (not unified).
    pub running_release: Option<String>,
    /// Releases already present on the node.
    pub downloaded: Vec<String>,
    /// Releases the node can download, in conductor order.
    pub available: Vec<String>,
    /// Coarse status. A string outside [`NodeStatus`] is kept as its parse
    /// error and only surfaces when this router's status is asked for.
    pub status: Result<NodeStatus, StatusParseError>,
    pub detail: String,
}

impl RouterAsset {
    pub fn sub_status(&self) -> Result<SubStatus, StatusParseError> {
        let status = self.status.clone()?;
        Ok(SubStatus::new(status, self.detail.clone()))
    }
}

// ── Rollout status ────────────────────────────────────────────────

/// Where a router stands in the current rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolloutStatus {
    /// Selected, not yet examined.
    Pending,
    /// Already at or past the target; nothing to do.
    Noop,
    /// Running release could not be read.
    Unknown,
    /// Target was already downloaded when the phase started.
    DownloadNotNeeded,
    /// Download requested or running.
    DownloadInProgress,
    /// Target downloaded during this run.
    DownloadCompleted,
    /// No release offered to the router matches the target.
    DownloadNotPossible,
    /// Download did not finish within the download timeout.
    DownloadTimedOut,
    /// Upgrade requested or running.
    UpgradeInProgress,
    /// Router runs the target.
    UpgradeCompleted,
}

impl RolloutStatus {
    pub const ALL: [RolloutStatus; 10] = [
        RolloutStatus::Pending,
        RolloutStatus::Noop,
        RolloutStatus::Unknown,
        RolloutStatus::DownloadNotNeeded,
        RolloutStatus::DownloadInProgress,
        RolloutStatus::DownloadCompleted,
        RolloutStatus::DownloadNotPossible,
        RolloutStatus::DownloadTimedOut,
        RolloutStatus::UpgradeInProgress,
        RolloutStatus::UpgradeCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RolloutStatus::Pending => "PENDING",
            RolloutStatus::Noop => "NOOP",
            RolloutStatus::Unknown => "UNKNOWN",
            RolloutStatus::DownloadNotNeeded => "DOWNLOAD_NOT_NEEDED",
            RolloutStatus::DownloadInProgress => "DOWNLOAD_IN_PROGRESS",
            RolloutStatus::DownloadCompleted => "DOWNLOAD_COMPLETED",
            RolloutStatus::DownloadNotPossible => "DOWNLOAD_NOT_POSSIBLE",
            RolloutStatus::DownloadTimedOut => "DOWNLOAD_TIMED_OUT",
            RolloutStatus::UpgradeInProgress => "UPGRADE_IN_PROGRESS",
            RolloutStatus::UpgradeCompleted => "UPGRADE_COMPLETED",
        }
    }
}

impl FromStr for RolloutStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RolloutStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| StatusParseError::UnknownRolloutStatus(s.to_string()))
    }
}

impl fmt::Display for RolloutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
