//! Chunk scheduler: windows the selected routers into chunks and runs
//! each chunk to completion before starting the next.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;
use tracing::{debug, info, warn};

use fleetup_conductor::ConductorApi;
use fleetup_core::{ReleaseVersion, RolloutStatus, RouterName};
use fleetup_state::StatusTracker;

use crate::clock::Clock;
use crate::controller::{Controller, Exclusion};
use crate::error::RolloutResult;
use crate::options::RolloutOptions;

/// End-of-run report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RolloutSummary {
    pub chunks: usize,
    /// Routers classified, i.e. every router inside the `max` cap.
    pub examined: usize,
    pub upgraded: Vec<RouterName>,
    pub exclusions: Vec<Exclusion>,
    pub statuses: BTreeMap<RolloutStatus, usize>,
}

/// Index ranges of the chunks over `len` routers.
///
/// Only the first `max` routers (all when `None`) are covered; a
/// `parallelism` of 0 means a single chunk.
pub fn chunk_windows(len: usize, parallelism: usize, max: Option<usize>) -> Vec<Range<usize>> {
    let end = max.map_or(len, |m| m.min(len));
    if end == 0 {
        return Vec::new();
    }
    let size = if parallelism == 0 { end } else { parallelism };
    (0..end)
        .step_by(size)
        .map(|start| start..(start + size).min(end))
        .collect()
}

/// How a router relates to the target at the start of its chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Running an older release.
    NeedsUpgrade,
    /// Already at or past the target.
    Noop,
    /// Running release unreadable.
    Unknown,
}

pub fn classify(running: Option<&str>, target: &ReleaseVersion) -> Classification {
    match running.map(ReleaseVersion::parse) {
        Some(Ok(version)) if version.is_older_than(target) => Classification::NeedsUpgrade,
        Some(Ok(_)) => Classification::Noop,
        _ => Classification::Unknown,
    }
}

/// Roll the target out over `routers`, chunk by chunk.
pub async fn run_rollout(
    api: &dyn ConductorApi,
    clock: &dyn Clock,
    options: &RolloutOptions,
    routers: &[RouterName],
    tracker: &mut StatusTracker,
) -> RolloutResult<RolloutSummary> {
    let target = ReleaseVersion::parse(&options.target)?;
    let controller = Controller::new(api, clock, options);
    let mut summary = RolloutSummary::default();

    for window in chunk_windows(routers.len(), options.parallelism, options.max_routers) {
        let chunk = &routers[window];
        summary.chunks += 1;
        summary.examined += chunk.len();
        info!(routers = %chunk.join(", "), "processing chunk");
        tracker.track(chunk);

        let mut needs_upgrade = Vec::new();
        for router in chunk {
            let running = api.running_release(router).await?;
            match classify(running.as_deref(), &target) {
                Classification::NeedsUpgrade => {
                    info!(%router, running = ?running, "router will be upgraded");
                    needs_upgrade.push(router.clone());
                }
                Classification::Noop => {
                    debug!(%router, running = ?running, "router already at target");
                    tracker.set(router, RolloutStatus::Noop);
                }
                Classification::Unknown => {
                    warn!(%router, "could not retrieve running version");
                    tracker.set(router, RolloutStatus::Unknown);
                }
            }
        }

        if needs_upgrade.is_empty() {
            info!("no routers to be upgraded in this chunk");
            continue;
        }

        let report = controller.run_chunk(needs_upgrade, tracker).await?;
        debug!(
            download_cycles = report.download_cycles,
            upgrade_cycles = report.upgrade_cycles,
            excluded = report.exclusions.len(),
            "chunk has been completed"
        );
        summary.upgraded.extend(report.upgraded);
        summary.exclusions.extend(report.exclusions);
    }

    summary.statuses = tracker.summary();
    Ok(summary)
}
