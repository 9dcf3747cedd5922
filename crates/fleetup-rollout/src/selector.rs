//! Router selection: base set, blacklist, then filters, in that order.
//!
//! Selection happens once per run; the resulting ordered list is what the
//! scheduler windows into chunks.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use fleetup_conductor::ConductorApi;
use fleetup_core::RouterName;

use crate::error::{RolloutError, RolloutResult};

/// One `key=value` narrowing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterFilter {
    /// `name.in=a,b,c`
    NameIn(Vec<String>),
    /// `name.startswith=branch-`
    NamePrefix(String),
    /// `name.equals=branch-1`
    NameEquals(String),
    /// `name.contains=east`
    NameContains(String),
    /// `version.equals=5.4.0-1.el7`
    VersionEquals(String),
    /// `version.startswith=5.4`
    VersionPrefix(String),
}

impl FromStr for RouterFilter {
    type Err = RolloutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| RolloutError::InvalidFilter(s.to_string()))?;
        let value = value.trim().to_string();
        let filter = match key.trim() {
            "name.in" => RouterFilter::NameIn(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            "name.startswith" => RouterFilter::NamePrefix(value),
            "name.equals" => RouterFilter::NameEquals(value),
            "name.contains" => RouterFilter::NameContains(value),
            "version.equals" => RouterFilter::VersionEquals(value),
            "version.startswith" => RouterFilter::VersionPrefix(value),
            other => return Err(RolloutError::UnknownFilterKey(other.to_string())),
        };
        Ok(filter)
    }
}

impl RouterFilter {
    /// `releases` are the raw running releases of the router's nodes.
    /// A router without any never matches a version filter.
    pub fn matches(&self, router: &str, releases: &[String]) -> bool {
        match self {
            RouterFilter::NameIn(names) => names.iter().any(|n| n == router),
            RouterFilter::NamePrefix(prefix) => router.starts_with(prefix.as_str()),
            RouterFilter::NameEquals(name) => router == name,
            RouterFilter::NameContains(part) => router.contains(part.as_str()),
            RouterFilter::VersionEquals(release) => releases.iter().any(|r| r == release),
            RouterFilter::VersionPrefix(prefix) => {
                releases.iter().any(|r| r.starts_with(prefix.as_str()))
            }
        }
    }
}

/// What the conductor knows about its routers at selection time.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    /// Every managed router, in conductor order.
    pub routers: Vec<RouterName>,
    /// The conductor's own router name.
    pub conductor: RouterName,
    /// Raw running release per node, keyed by router.
    pub running: HashMap<RouterName, Vec<String>>,
}

impl Fleet {
    pub async fn discover(api: &dyn ConductorApi) -> RolloutResult<Self> {
        let routers = api.list_routers().await?;
        let conductor = api.conductor_identity().await?;
        let snapshot = api.fetch_assets().await?;

        let mut running: HashMap<RouterName, Vec<String>> = HashMap::new();
        for asset in snapshot.assets() {
            if let Some(release) = &asset.running_release {
                running
                    .entry(asset.router.clone())
                    .or_default()
                    .push(release.clone());
            }
        }
        debug!(routers = routers.len(), %conductor, "fleet discovered");
        Ok(Self {
            routers,
            conductor,
            running,
        })
    }

    fn releases_of(&self, router: &str) -> &[String] {
        self.running.get(router).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Inputs to [`select`].
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Explicit router list; replaces the full fleet as base set.
    pub routers: Option<Vec<RouterName>>,
    pub blacklist: Vec<RouterName>,
    pub filters: Vec<RouterFilter>,
}

/// Apply the selection pipeline. The result may be empty.
pub fn apply(fleet: &Fleet, selection: &Selection) -> Vec<RouterName> {
    let members: HashSet<&str> = fleet.routers.iter().map(String::as_str).collect();
    let base: Vec<&RouterName> = match &selection.routers {
        Some(explicit) => explicit
            .iter()
            .filter(|r| members.contains(r.as_str()))
            .collect(),
        None => fleet
            .routers
            .iter()
            .filter(|r| **r != fleet.conductor)
            .collect(),
    };

    let blacklist: HashSet<&str> = selection.blacklist.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut routers: Vec<RouterName> = base
        .into_iter()
        .filter(|r| !blacklist.contains(r.as_str()))
        .filter(|r| seen.insert(r.as_str()))
        .cloned()
        .collect();

    for filter in &selection.filters {
        routers.retain(|r| filter.matches(r, fleet.releases_of(r)));
        debug!(?filter, remaining = routers.len(), "filter applied");
    }
    routers
}

/// [`apply`], treating an empty result as fatal.
pub fn select(fleet: &Fleet, selection: &Selection) -> RolloutResult<Vec<RouterName>> {
    let routers = apply(fleet, selection);
    if routers.is_empty() {
        return Err(RolloutError::NoRoutersSelected);
    }
    info!(count = routers.len(), "routers selected");
    Ok(routers)
}

/// Read a router or blacklist file: one name per line, blank lines and
/// `#` comments skipped, duplicates dropped.
pub fn read_name_file(path: &Path) -> RolloutResult<Vec<RouterName>> {
    let content = std::fs::read_to_string(path).map_err(|source| RolloutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_names(&content))
}

pub fn parse_names(content: &str) -> Vec<RouterName> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> Fleet {
        let routers = ["conductor", "branch-1", "branch-2", "east-hub", "branch-east"];
        Fleet {
            routers: routers.iter().map(|s| s.to_string()).collect(),
            conductor: "conductor".into(),
            running: HashMap::from([
                ("branch-1".to_string(), vec!["5.4.0-1.el7".to_string()]),
                (
                    "branch-2".to_string(),
                    vec!["5.5.2-1.el7".to_string(), "5.4.0-1.el7".to_string()],
                ),
                ("east-hub".to_string(), vec!["5.5.2-1.el7".to_string()]),
            ]),
        }
    }

    fn filters(list: &[&str]) -> Vec<RouterFilter> {
        list.iter().map(|f| f.parse().unwrap()).collect()
    }

    #[test]
    fn parses_every_filter_kind() {
        assert_eq!(
            "name.in=a, b,,c".parse::<RouterFilter>().unwrap(),
            RouterFilter::NameIn(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(
            "name.startswith=branch".parse::<RouterFilter>().unwrap(),
            RouterFilter::NamePrefix("branch".into())
        );
        assert_eq!(
            "version.startswith=5.4".parse::<RouterFilter>().unwrap(),
            RouterFilter::VersionPrefix("5.4".into())
        );
    }

    #[test]
    fn missing_separator_is_invalid() {
        let err = "name.startswith".parse::<RouterFilter>().unwrap_err();
        assert!(matches!(err, RolloutError::InvalidFilter(_)));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = "site.equals=x".parse::<RouterFilter>().unwrap_err();
        assert!(matches!(err, RolloutError::UnknownFilterKey(k) if k == "site.equals"));
    }

    #[test]
    fn fleet_base_excludes_conductor() {
        let routers = apply(&fleet(), &Selection::default());
        assert_eq!(routers, vec!["branch-1", "branch-2", "east-hub", "branch-east"]);
    }

    #[test]
    fn explicit_list_is_restricted_to_fleet_and_keeps_order() {
        let selection = Selection {
            routers: Some(parse_names("east-hub\nunknown\nbranch-1\neast-hub\n")),
            ..Selection::default()
        };
        assert_eq!(apply(&fleet(), &selection), vec!["east-hub", "branch-1"]);
    }

    #[test]
    fn blacklist_removes_names() {
        let selection = Selection {
            blacklist: vec!["branch-2".into(), "east-hub".into()],
            ..Selection::default()
        };
        assert_eq!(apply(&fleet(), &selection), vec!["branch-1", "branch-east"]);
    }

    #[test]
    fn version_filters_match_any_node() {
        let selection = Selection {
            filters: filters(&["version.equals=5.4.0-1.el7"]),
            ..Selection::default()
        };
        assert_eq!(apply(&fleet(), &selection), vec!["branch-1", "branch-2"]);

        // branch-east reports no release at all.
        let selection = Selection {
            filters: filters(&["version.startswith=5"]),
            ..Selection::default()
        };
        assert_eq!(
            apply(&fleet(), &selection),
            vec!["branch-1", "branch-2", "east-hub"]
        );
    }

    #[test]
    fn name_equals_collapses_to_singleton_or_empty() {
        let one = Selection {
            filters: filters(&["name.equals=east-hub"]),
            ..Selection::default()
        };
        assert_eq!(apply(&fleet(), &one), vec!["east-hub"]);

        let none = Selection {
            filters: filters(&["name.equals=conductor"]),
            ..Selection::default()
        };
        assert!(apply(&fleet(), &none).is_empty());
        assert!(matches!(
            select(&fleet(), &none),
            Err(RolloutError::NoRoutersSelected)
        ));
    }

    #[test]
    fn name_filters_commute() {
        let kinds = [
            "name.startswith=branch",
            "name.contains=east",
            "name.in=branch-east,east-hub,branch-1",
            "name.equals=branch-east",
        ];
        for a in kinds {
            for b in kinds {
                let ab = Selection {
                    filters: filters(&[a, b]),
                    ..Selection::default()
                };
                let ba = Selection {
                    filters: filters(&[b, a]),
                    ..Selection::default()
                };
                let single = Selection {
                    filters: filters(&[a]),
                    ..Selection::default()
                };
                let narrowed = apply(&fleet(), &ab);
                assert_eq!(narrowed, apply(&fleet(), &ba), "{a} / {b}");
                assert!(narrowed.len() <= apply(&fleet(), &single).len());
            }
        }
    }

    #[test]
    fn name_file_skips_comments_and_duplicates() {
        let names = parse_names("# site A\n  branch-1 \n\nbranch-2\nbranch-1\n#branch-3\n");
        assert_eq!(names, vec!["branch-1", "branch-2"]);
    }

    #[test]
    fn read_name_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routers.txt");
        assert!(matches!(
            read_name_file(&path),
            Err(RolloutError::Io { .. })
        ));

        std::fs::write(&path, "branch-1\n").unwrap();
        assert_eq!(read_name_file(&path).unwrap(), vec!["branch-1"]);
    }
}
