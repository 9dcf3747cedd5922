//! Point-in-time view over the conductor's asset list.
//!
//! One snapshot is taken per poll cycle so every decision within the
//! cycle sees the same data.

use std::collections::BTreeMap;

use fleetup_core::{ReleaseVersion, RouterAsset, RouterName, SubStatus, unified_release};

use crate::error::{ConductorError, ConductorResult};

/// Status lists longer than this are malformed (one entry per HA node).
pub const MAX_SUB_STATUSES: usize = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetSnapshot {
    assets: Vec<RouterAsset>,
}

impl AssetSnapshot {
    pub fn new(assets: Vec<RouterAsset>) -> Self {
        Self { assets }
    }

    pub fn assets(&self) -> &[RouterAsset] {
        &self.assets
    }

    /// All node assets belonging to `router`, in conductor order.
    pub fn nodes<'a>(&'a self, router: &'a str) -> impl Iterator<Item = &'a RouterAsset> + 'a {
        self.assets.iter().filter(move |a| a.router == router)
    }

    /// Unified running release of a router.
    ///
    /// For an HA pair this is the older of the two nodes, so a half
    /// upgraded router still counts as needing the upgrade. `None` when
    /// no node reports a parseable release.
    pub fn running_release(&self, router: &str) -> Option<String> {
        self.nodes(router)
            .filter_map(|a| a.running_release.as_deref())
            .filter_map(|raw| ReleaseVersion::parse(raw).ok())
            .min_by_key(|v| v.triple())
            .map(|v| v.unified())
    }

    /// Running release of every node, unified, in conductor order.
    pub fn node_releases(&self, router: &str) -> Vec<Option<String>> {
        self.nodes(router)
            .map(|a| a.running_release.as_deref().map(unified_release))
            .collect()
    }

    /// Releases already downloaded, per requested router.
    pub fn downloaded_releases(&self, routers: &[RouterName]) -> BTreeMap<RouterName, Vec<String>> {
        routers
            .iter()
            .filter(|router| self.nodes(router).next().is_some())
            .map(|router| (router.clone(), self.downloaded(router)))
            .collect()
    }

    /// Releases downloaded on every node of the router.
    pub fn downloaded(&self, router: &str) -> Vec<String> {
        let mut nodes = self.nodes(router);
        let Some(first) = nodes.next() else {
            return Vec::new();
        };
        let mut releases = first.downloaded.clone();
        for asset in nodes {
            releases.retain(|r| asset.downloaded.contains(r));
        }
        releases
    }

    /// Releases offered for download to the router (first node listing any).
    pub fn available(&self, router: &str) -> Vec<String> {
        self.nodes(router)
            .find(|a| !a.available.is_empty())
            .map(|a| a.available.clone())
            .unwrap_or_default()
    }

    /// Sub-status list for a router. More than two entries, or a node
    /// status outside the known set, is a hard error for this router only.
    pub fn status_of(&self, router: &str) -> ConductorResult<Vec<SubStatus>> {
        let statuses = self
            .nodes(router)
            .map(RouterAsset::sub_status)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| ConductorError::UnrecognizedStatus {
                router: router.to_string(),
                source,
            })?;
        if statuses.len() > MAX_SUB_STATUSES {
            return Err(ConductorError::TooManyStatuses {
                router: router.to_string(),
                count: statuses.len(),
            });
        }
        Ok(statuses)
    }
}
