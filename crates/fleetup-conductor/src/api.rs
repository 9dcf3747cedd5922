//! The capability surface the rollout engine needs from a conductor.

use std::collections::BTreeMap;

use async_trait::async_trait;

use fleetup_core::{RouterName, SubStatus};

use crate::error::ConductorResult;
use crate::snapshot::AssetSnapshot;

/// Abstraction over the conductor for testability.
/// Real implementation: `RestConductor`. Tests provide scripted fakes.
///
/// Download and upgrade requests are fire-and-forget: their outcome is
/// only ever observed through later [`ConductorApi::fetch_assets`] calls.
#[async_trait]
pub trait ConductorApi: Send + Sync {
    /// Obtain or refresh the bearer credential.
    async fn authenticate(&self) -> ConductorResult<()>;

    /// Names of every router managed by the conductor.
    async fn list_routers(&self) -> ConductorResult<Vec<RouterName>>;

    /// The conductor's own router name.
    async fn conductor_identity(&self) -> ConductorResult<RouterName>;

    async fn conductor_version(&self) -> ConductorResult<String>;

    /// Every release the conductor knows of, optionally from the local cache.
    async fn list_upgrade_versions(&self, use_cache: bool) -> ConductorResult<Vec<String>>;

    /// Current asset list. Implementations may serve a copy that is a few
    /// seconds old.
    async fn fetch_assets(&self) -> ConductorResult<AssetSnapshot>;

    async fn request_download(&self, router: &str, release: &str) -> ConductorResult<()>;

    async fn request_upgrade(&self, router: &str, release: &str) -> ConductorResult<()>;

    /// Unified running release of a router, `None` if unreadable.
    async fn running_release(&self, router: &str) -> ConductorResult<Option<String>> {
        Ok(self.fetch_assets().await?.running_release(router))
    }

    async fn downloaded_releases(
        &self,
        routers: &[RouterName],
    ) -> ConductorResult<BTreeMap<RouterName, Vec<String>>> {
        Ok(self.fetch_assets().await?.downloaded_releases(routers))
    }

    async fn available_releases(&self, router: &str) -> ConductorResult<Vec<String>> {
        Ok(self.fetch_assets().await?.available(router))
    }

    async fn status_of(&self, router: &str) -> ConductorResult<Vec<SubStatus>> {
        self.fetch_assets().await?.status_of(router)
    }
}
