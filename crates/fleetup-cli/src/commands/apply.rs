//! `fleetup --release TARGET`: select routers and roll the release out.

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};

use fleetup_conductor::ConductorApi;
use fleetup_core::RolloutStatus;
use fleetup_rollout::{
    Fleet, ReleaseCatalog, RolloutError, RolloutSummary, Selection, SystemClock, read_name_file,
    run_rollout, select,
};
use fleetup_state::{StatusFile, StatusTracker};

use crate::settings::Settings;

pub async fn run(
    api: &dyn ConductorApi,
    settings: &Settings,
    catalog: &ReleaseCatalog,
) -> anyhow::Result<()> {
    let target = &settings.rollout.target;
    if !catalog.contains(target) {
        return Err(RolloutError::ReleaseNotInCatalog(target.clone()).into());
    }

    let selection = selection(settings)?;
    let fleet = Fleet::discover(api).await?;
    let routers = select(&fleet, &selection)?;
    debug!(routers = ?routers, "selected routers");

    let mut tracker = match &settings.status_file {
        Some(path) => {
            report_previous_run(path);
            StatusTracker::with_status_file(path)
        }
        None => StatusTracker::new(),
    };

    let summary = run_rollout(api, &SystemClock, &settings.rollout, &routers, &mut tracker).await?;
    log_summary(&summary);
    Ok(())
}

fn selection(settings: &Settings) -> anyhow::Result<Selection> {
    let routers = settings
        .router_file
        .as_deref()
        .map(read_name_file)
        .transpose()
        .context("failed to read router file")?;
    let blacklist = match &settings.blacklist_file {
        Some(path) => read_name_file(path).context("failed to read blacklist file")?,
        None => Vec::new(),
    };
    Ok(Selection {
        routers,
        blacklist,
        filters: settings.filters.clone(),
    })
}

/// A status file from an interrupted run is overwritten; say what it held.
fn report_previous_run(path: &Path) {
    if !path.exists() {
        return;
    }
    match StatusFile::new(path).load() {
        Ok(previous) => {
            let unfinished = previous
                .values()
                .filter(|s| !matches!(s, RolloutStatus::Noop | RolloutStatus::UpgradeCompleted))
                .count();
            info!(path = %path.display(), routers = previous.len(), unfinished, "replacing status file of a previous run");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "ignoring unreadable status file"),
    }
}

fn log_summary(summary: &RolloutSummary) {
    let counts = summary
        .statuses
        .iter()
        .map(|(status, count)| format!("{status}={count}"))
        .collect::<Vec<_>>()
        .join(" ");
    info!(
        chunks = summary.chunks,
        examined = summary.examined,
        upgraded = summary.upgraded.len(),
        statuses = %counts,
        "rollout finished"
    );
    for exclusion in &summary.exclusions {
        warn!(router = %exclusion.router, reason = ?exclusion.reason, "router excluded from rollout");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use fleetup_core::FleetupConfig;

    fn settings(args: &[&str]) -> Settings {
        let mut argv = vec!["fleetup", "-r", "5.5.2"];
        argv.extend_from_slice(args);
        let cli = crate::Cli::try_parse_from(argv).unwrap();
        Settings::resolve(&cli, &FleetupConfig::default()).unwrap()
    }

    #[test]
    fn selection_reads_router_and_blacklist_files() {
        let dir = tempfile::tempdir().unwrap();
        let routers = dir.path().join("routers.txt");
        let blacklist = dir.path().join("blacklist.txt");
        std::fs::write(&routers, "branch-1\nbranch-2\n").unwrap();
        std::fs::write(&blacklist, "# keep\nbranch-2\n").unwrap();

        let selection = selection(&settings(&[
            "--router-file",
            routers.to_str().unwrap(),
            "--blacklist-file",
            blacklist.to_str().unwrap(),
            "-f",
            "name.contains=branch",
        ]))
        .unwrap();

        assert_eq!(
            selection.routers,
            Some(vec!["branch-1".to_string(), "branch-2".to_string()])
        );
        assert_eq!(selection.blacklist, vec!["branch-2"]);
        assert_eq!(selection.filters.len(), 1);
    }

    #[test]
    fn missing_router_file_is_an_error() {
        let err = selection(&settings(&["--router-file", "/nonexistent/routers.txt"])).unwrap_err();
        assert!(err.to_string().contains("router file"));
    }

    #[test]
    fn no_files_means_whole_fleet() {
        let selection = selection(&settings(&[])).unwrap();
        assert!(selection.routers.is_none());
        assert!(selection.blacklist.is_empty());
    }
}
