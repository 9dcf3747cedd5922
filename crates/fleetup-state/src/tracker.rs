//! StatusTracker: per-router rollout status for the lifetime of a run.
//!
//! Every change is mirrored to the optional status file. Writing that
//! file is best-effort: a failure is logged and the in-memory map stays
//! authoritative.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use fleetup_core::{RolloutStatus, RouterName};

use crate::status_file::StatusFile;

#[derive(Debug, Default)]
pub struct StatusTracker {
    statuses: BTreeMap<RouterName, RolloutStatus>,
    /// Routers whose completion has already been announced.
    announced: HashSet<RouterName>,
    sink: Option<StatusFile>,
}

impl StatusTracker {
    /// A tracker that only keeps statuses in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker that rewrites `path` after every change.
    pub fn with_status_file(path: impl Into<PathBuf>) -> Self {
        Self {
            sink: Some(StatusFile::new(path)),
            ..Self::default()
        }
    }

    /// Start tracking `routers` as `PENDING`. Routers already tracked keep
    /// their status.
    pub fn track(&mut self, routers: &[RouterName]) {
        let mut added = false;
        for router in routers {
            if !self.statuses.contains_key(router) {
                self.statuses.insert(router.clone(), RolloutStatus::Pending);
                added = true;
            }
        }
        if added {
            self.persist();
        }
    }

    /// Record `status` for `router`. Returns whether anything changed;
    /// the status file is only rewritten on change.
    pub fn set(&mut self, router: &str, status: RolloutStatus) -> bool {
        let previous = self.statuses.insert(router.to_string(), status);
        if previous == Some(status) {
            return false;
        }
        debug!(%router, from = ?previous, to = %status, "status changed");
        self.persist();
        true
    }

    /// Mark `router` as upgraded. The completion message is logged once
    /// per router no matter how often this is called.
    pub fn mark_completed(&mut self, router: &str) -> bool {
        let changed = self.set(router, RolloutStatus::UpgradeCompleted);
        if self.announced.insert(router.to_string()) {
            info!(%router, "router upgrade completed");
        }
        changed
    }

    pub fn get(&self, router: &str) -> Option<RolloutStatus> {
        self.statuses.get(router).copied()
    }

    pub fn statuses(&self) -> &BTreeMap<RouterName, RolloutStatus> {
        &self.statuses
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Routers currently in `status`, in name order.
    pub fn routers_in(&self, status: RolloutStatus) -> Vec<&RouterName> {
        self.statuses
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(router, _)| router)
            .collect()
    }

    /// Number of routers per status; statuses with no routers are omitted.
    pub fn summary(&self) -> BTreeMap<RolloutStatus, usize> {
        let mut counts = BTreeMap::new();
        for status in self.statuses.values() {
            *counts.entry(*status).or_insert(0) += 1;
        }
        counts
    }

    fn persist(&self) {
        if let Some(sink) = &self.sink
            && let Err(e) = sink.write(&self.statuses)
        {
            warn!(path = ?sink.path(), error = %e, "could not update status file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<RouterName> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn track_starts_pending_and_keeps_existing() {
        let mut tracker = StatusTracker::new();
        tracker.track(&names(&["a", "b"]));
        tracker.set("a", RolloutStatus::Noop);
        tracker.track(&names(&["a", "c"]));

        assert_eq!(tracker.get("a"), Some(RolloutStatus::Noop));
        assert_eq!(tracker.get("b"), Some(RolloutStatus::Pending));
        assert_eq!(tracker.get("c"), Some(RolloutStatus::Pending));
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn set_reports_change() {
        let mut tracker = StatusTracker::new();
        assert!(tracker.set("a", RolloutStatus::DownloadInProgress));
        assert!(!tracker.set("a", RolloutStatus::DownloadInProgress));
        assert!(tracker.set("a", RolloutStatus::DownloadCompleted));
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let mut tracker = StatusTracker::new();
        assert!(tracker.mark_completed("a"));
        assert!(!tracker.mark_completed("a"));
        assert_eq!(tracker.get("a"), Some(RolloutStatus::UpgradeCompleted));
        assert_eq!(tracker.announced.len(), 1);
    }

    #[test]
    fn summary_counts_by_status() {
        let mut tracker = StatusTracker::new();
        tracker.set("a", RolloutStatus::Noop);
        tracker.set("b", RolloutStatus::Noop);
        tracker.set("c", RolloutStatus::DownloadNotPossible);

        let summary = tracker.summary();
        assert_eq!(summary.get(&RolloutStatus::Noop), Some(&2));
        assert_eq!(summary.get(&RolloutStatus::DownloadNotPossible), Some(&1));
        assert_eq!(summary.get(&RolloutStatus::Pending), None);
        assert_eq!(tracker.routers_in(RolloutStatus::Noop), vec!["a", "b"]);
    }

    #[test]
    fn changes_are_mirrored_to_status_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        let mut tracker = StatusTracker::with_status_file(&path);

        tracker.track(&names(&["a", "b"]));
        tracker.set("b", RolloutStatus::DownloadTimedOut);

        let on_disk = StatusFile::new(&path).load().unwrap();
        assert_eq!(&on_disk, tracker.statuses());
    }

    #[test]
    fn without_sink_nothing_is_written() {
        let mut tracker = StatusTracker::new();
        tracker.set("a", RolloutStatus::Unknown);
        assert!(tracker.sink.is_none());
    }

    #[test]
    fn unwritable_status_file_does_not_fail_updates() {
        let mut tracker = StatusTracker::with_status_file("/nonexistent/dir/status");
        assert!(tracker.set("a", RolloutStatus::Noop));
        assert_eq!(tracker.get("a"), Some(RolloutStatus::Noop));
    }
}
