//! Release catalog: which releases may be rolled out, and how they order.

use tracing::debug;

use fleetup_conductor::ConductorApi;
use fleetup_core::{ReleaseVersion, unified_release};

use crate::error::RolloutResult;

/// Releases the conductor offers, restricted to those at or above
/// [`fleetup_core::MIN_RELEASE`]. Conductor order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseCatalog {
    releases: Vec<String>,
}

impl ReleaseCatalog {
    pub fn new<I, S>(releases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let releases = releases
            .into_iter()
            .map(Into::into)
            .filter(|raw: &String| match ReleaseVersion::parse(raw) {
                Ok(version) => version.meets_floor(),
                Err(_) => {
                    debug!(release = %raw, "ignoring unparseable release");
                    false
                }
            })
            .collect();
        Self { releases }
    }

    /// Load the catalog from the conductor; `use_cache` allows the local
    /// release-list cache to answer.
    pub async fn fetch(api: &dyn ConductorApi, use_cache: bool) -> RolloutResult<Self> {
        let raw = api.list_upgrade_versions(use_cache).await?;
        let catalog = Self::new(raw);
        debug!(releases = catalog.releases.len(), "release catalog loaded");
        Ok(catalog)
    }

    pub fn releases(&self) -> &[String] {
        &self.releases
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// `target` is a catalog entry, or the unified form of one.
    pub fn contains(&self, target: &str) -> bool {
        self.releases
            .iter()
            .any(|r| r == target || unified_release(r) == target)
    }
}

/// First release offered to a router that starts with `target`.
pub fn resolve_target<'a>(offered: &'a [String], target: &str) -> Option<&'a str> {
    offered
        .iter()
        .map(String::as_str)
        .find(|release| release.starts_with(target))
}

/// `a` is strictly older than `b`, comparing `(major, minor, patch)` only.
pub fn is_older(a: &str, b: &str) -> RolloutResult<bool> {
    let a = ReleaseVersion::parse(a)?;
    let b = ReleaseVersion::parse(b)?;
    Ok(a.is_older_than(&b))
}
