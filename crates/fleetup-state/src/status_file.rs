//! Fixed-width text form of the rollout status map.
//!
//! ```text
//! branch-001                              DOWNLOAD_IN_PROGRESS
//! branch-002                              UPGRADE_COMPLETED
//! ```
//!
//! The file is rewritten in full after every change: written to a
//! sibling temp file, then renamed over the target.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use fleetup_core::{RolloutStatus, RouterName};

use crate::error::{StateError, StateResult};

/// Width of the router name column.
pub const NAME_COLUMN_WIDTH: usize = 40;

#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, statuses: &BTreeMap<RouterName, RolloutStatus>) -> StateResult<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_err = |source| StateError::Write {
            path: self.path.clone(),
            source,
        };
        std::fs::write(&tmp, render(statuses)).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        debug!(path = ?self.path, routers = statuses.len(), "status file written");
        Ok(())
    }

    /// Read back a status file, e.g. one left behind by an interrupted run.
    pub fn load(&self) -> StateResult<BTreeMap<RouterName, RolloutStatus>> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| StateError::Read {
            path: self.path.clone(),
            source,
        })?;
        parse(&content)
    }
}

/// One line per router in name order: padded name column, then status.
pub fn render(statuses: &BTreeMap<RouterName, RolloutStatus>) -> String {
    let mut out = String::new();
    for (router, status) in statuses {
        let name = format!("{router:<NAME_COLUMN_WIDTH$}");
        out.push_str(&name);
        if router.len() >= NAME_COLUMN_WIDTH {
            out.push(' ');
        }
        out.push_str(status.as_str());
        out.push('\n');
    }
    out
}

pub fn parse(content: &str) -> StateResult<BTreeMap<RouterName, RolloutStatus>> {
    let mut statuses = BTreeMap::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let malformed = || StateError::Malformed {
            line: index + 1,
            content: line.to_string(),
        };
        let (router, status) = line.trim_end().rsplit_once(' ').ok_or_else(malformed)?;
        let status: RolloutStatus = status.parse().map_err(|_| malformed())?;
        let router = router.trim_end();
        if router.is_empty() {
            return Err(malformed());
        }
        statuses.insert(router.to_string(), status);
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BTreeMap<RouterName, RolloutStatus> {
        BTreeMap::from([
            ("branch-2".to_string(), RolloutStatus::UpgradeCompleted),
            ("branch-1".to_string(), RolloutStatus::DownloadInProgress),
        ])
    }

    #[test]
    fn render_pads_name_column_in_name_order() {
        let text = render(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("branch-1 "));
        assert_eq!(lines[0].find("DOWNLOAD_IN_PROGRESS"), Some(NAME_COLUMN_WIDTH));
        assert_eq!(lines[1].find("UPGRADE_COMPLETED"), Some(NAME_COLUMN_WIDTH));
    }

    #[test]
    fn long_names_keep_a_separator() {
        let long = "x".repeat(NAME_COLUMN_WIDTH + 5);
        let statuses = BTreeMap::from([(long.clone(), RolloutStatus::Noop)]);
        let text = render(&statuses);
        assert_eq!(text, format!("{long} NOOP\n"));
        assert_eq!(parse(&text).unwrap(), statuses);
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = StatusFile::new(dir.path().join("status"));
        file.write(&sample()).unwrap();
        assert_eq!(file.load().unwrap(), sample());
        assert!(!dir.path().join("status.tmp").exists());
    }

    #[test]
    fn rewrite_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = StatusFile::new(dir.path().join("status"));
        file.write(&sample()).unwrap();

        let fewer = BTreeMap::from([("branch-9".to_string(), RolloutStatus::Unknown)]);
        file.write(&fewer).unwrap();
        assert_eq!(file.load().unwrap(), fewer);
    }

    #[test]
    fn parse_rejects_unknown_status() {
        let err = parse("branch-1     SLEEPING\n").unwrap_err();
        assert!(matches!(err, StateError::Malformed { line: 1, .. }));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let file = StatusFile::new("/nonexistent/dir/status");
        assert!(matches!(
            file.write(&sample()),
            Err(StateError::Write { .. })
        ));
    }
}
