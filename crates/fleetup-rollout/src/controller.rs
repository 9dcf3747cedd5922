//! Rollout controller: drives one chunk through the download and
//! upgrade phases.
//!
//! Each phase is a poll loop: take one asset snapshot, apply the
//! transition function to every router, write statuses, then either
//! finish, time out, or sleep for the poll interval. The deadline is
//! checked once per cycle, after the cycle's observation.

use serde::Serialize;
use tracing::{debug, info, warn};

use fleetup_conductor::ConductorApi;
use fleetup_core::{RolloutStatus, RouterName};
use fleetup_state::StatusTracker;

use crate::clock::Clock;
use crate::error::{RolloutError, RolloutResult};
use crate::machine::{
    DownloadStep, Phase, RouterView, Target, UpgradeStep, download_step, upgrade_step,
};
use crate::options::RolloutOptions;

/// Why a router was dropped from its chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExclusionReason {
    /// No release offered to the router matches the target.
    DownloadNotPossible,
    /// Still downloading when the download timeout expired.
    DownloadTimedOut,
    /// Not at the target when the upgrade timeout expired.
    UpgradeTimedOut,
}

/// A router dropped from its chunk under ignore-errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    /// Router that was dropped.
    pub router: RouterName,
    /// Why it was dropped.
    pub reason: ExclusionReason,
}

impl Exclusion {
    fn new(router: &str, reason: ExclusionReason) -> Self {
        Self {
            router: router.to_string(),
            reason,
        }
    }
}

/// Outcome of one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    /// Routers that reached the target in the upgrade phase.
    pub upgraded: Vec<RouterName>,
    /// Routers dropped in either phase, in the order they were dropped.
    pub exclusions: Vec<Exclusion>,
    /// Poll cycles spent in the download phase.
    pub download_cycles: usize,
    /// Poll cycles spent in the upgrade phase.
    pub upgrade_cycles: usize,
}

impl ChunkReport {
    fn exclude(&mut self, routers: &[RouterName], reason: ExclusionReason) {
        self.exclusions
            .extend(routers.iter().map(|r| Exclusion::new(r, reason)));
    }
}

pub struct Controller<'a> {
    api: &'a dyn ConductorApi,
    clock: &'a dyn Clock,
    options: &'a RolloutOptions,
    target: Target,
}

impl<'a> Controller<'a> {
    pub fn new(api: &'a dyn ConductorApi, clock: &'a dyn Clock, options: &'a RolloutOptions) -> Self {
        Self {
            api,
            clock,
            options,
            target: Target::new(&options.target),
        }
    }

    /// Download, then (unless dry-run or download-only) upgrade `routers`.
    pub async fn run_chunk(
        &self,
        mut routers: Vec<RouterName>,
        tracker: &mut StatusTracker,
    ) -> RolloutResult<ChunkReport> {
        let mut report = ChunkReport::default();

        self.download_phase(&mut routers, tracker, &mut report).await?;
        debug!(routers = ?routers, "chunk ready for upgrade");

        if !self.options.runs_upgrade() {
            debug!(
                dry_run = self.options.dry_run,
                download_only = self.options.download_only,
                "skipping upgrades"
            );
        } else if !routers.is_empty() {
            self.upgrade_phase(&routers, tracker, &mut report).await?;
        }
        Ok(report)
    }

    /// Poll until every router has the target downloaded. Routers that
    /// cannot download it (or, under ignore-errors, time out) are removed
    /// from `routers`.
    pub async fn download_phase(
        &self,
        routers: &mut Vec<RouterName>,
        tracker: &mut StatusTracker,
        report: &mut ChunkReport,
    ) -> RolloutResult<()> {
        let started = self.clock.now();
        let timeout = self.options.download_timeout;
        let ignore_errors = self.options.ignore_download_errors;

        loop {
            let first_cycle = report.download_cycles == 0;
            report.download_cycles += 1;
            let snapshot = self.api.fetch_assets().await?;

            let mut pending: Vec<RouterName> = Vec::new();
            let mut not_possible: Vec<RouterName> = Vec::new();

            for router in routers.iter() {
                let view = RouterView::capture(&snapshot, router)?;
                match download_step(&view, &self.target) {
                    DownloadStep::Upgrading => {
                        tracker.set(router, RolloutStatus::UpgradeInProgress);
                        debug!(%router, "upgrade already in progress");
                    }
                    DownloadStep::Downloading => {
                        tracker.set(router, RolloutStatus::DownloadInProgress);
                        debug!(%router, details = %view.details(), "router is downloading");
                        pending.push(router.clone());
                    }
                    DownloadStep::Downloaded => {
                        let status = if first_cycle {
                            RolloutStatus::DownloadNotNeeded
                        } else {
                            RolloutStatus::DownloadCompleted
                        };
                        tracker.set(router, status);
                    }
                    DownloadStep::NotPossible => {
                        tracker.set(router, RolloutStatus::DownloadNotPossible);
                        if !ignore_errors {
                            return Err(RolloutError::ReleaseUnavailable {
                                router: router.clone(),
                                target: self.target.requested.clone(),
                            });
                        }
                        warn!(%router, target = %self.target.requested, "release not available, dropping router from chunk");
                        not_possible.push(router.clone());
                    }
                    DownloadStep::Request { release } if self.options.dry_run => {
                        info!(%router, %release, "dry run, would request download");
                    }
                    DownloadStep::Request { release } => {
                        info!(%router, %release, "requesting download");
                        self.api.request_download(router, &release).await?;
                        tracker.set(router, RolloutStatus::DownloadInProgress);
                        pending.push(router.clone());
                    }
                }
            }

            routers.retain(|r| !not_possible.contains(r));
            report.exclude(&not_possible, ExclusionReason::DownloadNotPossible);

            if pending.is_empty() || self.options.dry_run {
                return Ok(());
            }

            if self.clock.now().duration_since(started) > timeout {
                for router in &pending {
                    tracker.set(router, RolloutStatus::DownloadTimedOut);
                }
                if !ignore_errors {
                    return Err(RolloutError::PhaseTimeout {
                        phase: Phase::Download,
                        after: timeout,
                    });
                }
                warn!(routers = ?pending, timeout_secs = timeout.as_secs(), "download timed out, dropping routers from chunk");
                routers.retain(|r| !pending.contains(r));
                report.exclude(&pending, ExclusionReason::DownloadTimedOut);
                return Ok(());
            }

            debug!(
                waiting = pending.len(),
                interval_secs = self.options.poll_interval.as_secs(),
                "waiting for downloads"
            );
            self.clock.sleep(self.options.poll_interval).await;
        }
    }

    /// Poll until every router runs the target.
    pub async fn upgrade_phase(
        &self,
        routers: &[RouterName],
        tracker: &mut StatusTracker,
        report: &mut ChunkReport,
    ) -> RolloutResult<()> {
        let started = self.clock.now();
        let timeout = self.options.upgrade_timeout;
        let mut remaining: Vec<RouterName> = routers.to_vec();

        loop {
            report.upgrade_cycles += 1;
            let snapshot = self.api.fetch_assets().await?;
            let mut waiting: Vec<RouterName> = Vec::new();

            for router in &remaining {
                let view = RouterView::capture(&snapshot, router)?;
                match upgrade_step(&view, &self.target, self.options.wait_for_stable) {
                    UpgradeStep::Upgrading => {
                        tracker.set(router, RolloutStatus::UpgradeInProgress);
                        debug!(%router, details = %view.details(), "router is upgrading");
                        waiting.push(router.clone());
                    }
                    UpgradeStep::AwaitingStable => {
                        debug!(%router, "upgraded, waiting for a stable state");
                        waiting.push(router.clone());
                    }
                    UpgradeStep::Completed => {
                        tracker.mark_completed(router);
                        report.upgraded.push(router.clone());
                    }
                    UpgradeStep::Request { release } => {
                        info!(%router, %release, "requesting upgrade");
                        self.api.request_upgrade(router, &release).await?;
                        tracker.set(router, RolloutStatus::UpgradeInProgress);
                        waiting.push(router.clone());
                    }
                    UpgradeStep::Unavailable => {
                        return Err(RolloutError::ReleaseUnavailable {
                            router: router.clone(),
                            target: self.target.requested.clone(),
                        });
                    }
                    UpgradeStep::Disconnected => {
                        debug!(%router, "all nodes disconnected, waiting");
                        waiting.push(router.clone());
                    }
                    UpgradeStep::Waiting => {
                        debug!(%router, statuses = ?view.statuses, "waiting for router");
                        waiting.push(router.clone());
                    }
                }
            }

            remaining = waiting;
            if remaining.is_empty() {
                return Ok(());
            }

            if self.clock.now().duration_since(started) > timeout {
                if !self.options.ignore_download_errors {
                    return Err(RolloutError::PhaseTimeout {
                        phase: Phase::Upgrade,
                        after: timeout,
                    });
                }
                warn!(routers = ?remaining, timeout_secs = timeout.as_secs(), "upgrade timed out, dropping routers from chunk");
                report.exclude(&remaining, ExclusionReason::UpgradeTimedOut);
                return Ok(());
            }

            debug!(
                waiting = remaining.len(),
                interval_secs = self.options.poll_interval.as_secs(),
                "waiting for upgrades"
            );
            self.clock.sleep(self.options.poll_interval).await;
        }
    }
}
