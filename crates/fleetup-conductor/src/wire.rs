//! JSON shapes returned by the conductor REST API and their conversion
//! into domain types.

use serde::{Deserialize, Serialize};

use fleetup_core::{NodeStatus, RouterAsset};

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    /// Private key contents for local (key-based) login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SystemInfo {
    pub router: String,
    pub software_version: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RouterRecord {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionRecord {
    pub version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssetRecord {
    pub router_name: String,
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub t128_version: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub software_versions: SoftwareVersions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SoftwareVersions {
    pub downloaded_version: Option<Vec<String>>,
    pub available_version: Option<Vec<String>>,
    pub currently_downloading_version: Option<String>,
    pub refresh: Refresh,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Refresh {
    pub in_progress: bool,
}

impl AssetRecord {
    /// A refresh in progress or a version being fetched is reported as
    /// `DOWNLOADING` regardless of the raw status.
    fn is_downloading(&self) -> bool {
        let versions = &self.software_versions;
        versions.refresh.in_progress
            || versions
                .currently_downloading_version
                .as_deref()
                .is_some_and(|v| !v.is_empty())
    }

    /// An unrecognized status does not fail the conversion; it stays on
    /// the asset so other routers in the same listing remain usable.
    pub fn into_asset(self) -> RouterAsset {
        let status = if self.is_downloading() {
            Ok(NodeStatus::Downloading)
        } else {
            self.status.parse::<NodeStatus>()
        };

        RouterAsset {
            router: self.router_name,
            node: self.node_name,
            running_release: self.t128_version.filter(|v| !v.is_empty()),
            downloaded: self.software_versions.downloaded_version.unwrap_or_default(),
            available: self.software_versions.available_version.unwrap_or_default(),
            status,
            detail: self.text.unwrap_or_default(),
        }
    }
}

/// Release strings from the version listing carry an `.el7` tag the
/// routers do not use.
pub(crate) fn normalize_release(version: &str) -> String {
    version.replace(".el7", "")
}

pub(crate) const DOWNLOAD_MUTATION: &str = r#"
mutation AssetDownload($routerNames: [String]!, $version: String!) {
    sendAssetDownloadSoftwareRequest(routerNames: $routerNames, version: $version) {
        routerName
        response
    }
}"#;

pub(crate) const UPGRADE_MUTATION: &str = r#"
mutation AssetUpgrade($routerNames: [String]!, $version: String!, $force: Boolean, $ignorePreCheck: Boolean) {
    sendAssetUpgradeRequest(routerNames: $routerNames, version: $version, force: $force, ignorePreCheck: $ignorePreCheck) {
        routerName
        response
    }
}"#;

/// GraphQL request body for a single-router asset mutation.
pub(crate) fn mutation_body(query: &str, router: &str, release: &str) -> serde_json::Value {
    serde_json::json!({
        "query": query,
        "variables": {
            "routerNames": [router],
            "version": release,
        }
    })
}
