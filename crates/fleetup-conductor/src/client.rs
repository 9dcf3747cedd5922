//! REST/GraphQL client for a conductor.
//!
//! One `reqwest::Client` (and one bearer token) is reused for every
//! call. A 401 triggers a single re-login and retry of the same request.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fleetup_core::{RouterAsset, RouterName};

use crate::api::ConductorApi;
use crate::cache::{ReleaseCache, TokenFile};
use crate::error::{ConductorError, ConductorResult};
use crate::snapshot::AssetSnapshot;
use crate::wire::{
    self, AssetRecord, ErrorResponse, LoginRequest, LoginResponse, RouterRecord, SystemInfo,
    VersionRecord,
};

/// Asset listings younger than this are served from memory.
pub const ASSET_CACHE_TTL: Duration = Duration::from_secs(5);

/// Key files tried, in order, when neither a password nor a key file is set.
const DEFAULT_KEY_FILES: &[&str] = &["pdc_ssh_key", "/home/admin/.ssh/pdc_ssh_key"];

/// How the client logs in.
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { user: String, password: String },
    /// Local login with a private key; `None` searches the default locations.
    LocalKey { user: String, key_file: Option<PathBuf> },
}

impl Credentials {
    pub fn user(&self) -> &str {
        match self {
            Credentials::Password { user, .. } | Credentials::LocalKey { user, .. } => user,
        }
    }
}

/// Connection settings for [`RestConductor`].
#[derive(Debug, Clone)]
pub struct ConductorSettings {
    /// Host name, or a full `http(s)://host[:port]` base.
    pub host: String,
    pub credentials: Credentials,
    pub verify_tls: bool,
    /// Sent as the user agent and used to name the local cache files.
    pub app: String,
    pub token_file: Option<PathBuf>,
    pub release_cache: Option<PathBuf>,
}

struct CachedAssets {
    fetched_at: Instant,
    snapshot: AssetSnapshot,
}

pub struct RestConductor {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: Mutex<Option<String>>,
    token_file: Option<TokenFile>,
    release_cache: Option<ReleaseCache>,
    assets: Mutex<Option<CachedAssets>>,
    asset_ttl: Duration,
}

impl RestConductor {
    pub fn new(settings: ConductorSettings) -> ConductorResult<Self> {
        let base_url = base_url(&settings.host);
        let http = reqwest::Client::builder()
            .user_agent(settings.app.as_str())
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()
            .map_err(|source| ConductorError::Http {
                url: base_url.clone(),
                source,
            })?;

        let token_file = settings.token_file.map(TokenFile::new);
        let token = token_file.as_ref().and_then(TokenFile::read);

        Ok(Self {
            http,
            base_url,
            credentials: settings.credentials,
            token: Mutex::new(token),
            token_file,
            release_cache: settings.release_cache.map(ReleaseCache::new),
            assets: Mutex::new(None),
            asset_ttl: ASSET_CACHE_TTL,
        })
    }

    /// Whether a bearer token (fresh or from the token file) is held.
    pub async fn has_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    fn url(&self, location: &str) -> String {
        format!("{}/{}", self.base_url, location.trim_matches('/'))
    }

    /// Send a request with the current token; on 401 log in again and
    /// retry exactly once.
    async fn send(
        &self,
        method: Method,
        location: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> ConductorResult<reqwest::Response> {
        let url = self.url(location);
        let mut reauthenticated = false;

        loop {
            let mut request = self.http.request(method.clone(), &url).query(query);
            if let Some(token) = self.token.lock().await.as_deref() {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|source| ConductorError::Http {
                url: url.clone(),
                source,
            })?;

            match response.status() {
                StatusCode::UNAUTHORIZED if !reauthenticated => {
                    debug!(%url, "token rejected, logging in again");
                    self.authenticate().await?;
                    reauthenticated = true;
                }
                StatusCode::UNAUTHORIZED => {
                    return Err(ConductorError::Unauthorized(format!(
                        "{url} rejected a freshly issued token"
                    )));
                }
                status if !status.is_success() => {
                    return Err(ConductorError::Status {
                        url,
                        status: status.as_u16(),
                    });
                }
                _ => return Ok(response),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        location: &str,
        query: &[(&str, &str)],
    ) -> ConductorResult<T> {
        let response = self.send(Method::GET, location, query, None).await?;
        let url = response.url().to_string();
        response
            .json::<T>()
            .await
            .map_err(|source| ConductorError::Http { url, source })
    }

    async fn system_info(&self) -> ConductorResult<SystemInfo> {
        self.get_json("system", &[]).await
    }

    async fn mutate(&self, query: &str, router: &str, release: &str) -> ConductorResult<()> {
        let body = wire::mutation_body(query, router, release);
        let response = self.send(Method::POST, "graphql", &[], Some(&body)).await?;

        // Fire-and-forget: GraphQL errors are reported, the outcome is
        // observed by polling.
        if let Ok(reply) = response.json::<serde_json::Value>().await
            && let Some(errors) = reply.get("errors").and_then(|e| e.as_array())
            && !errors.is_empty()
        {
            warn!(%router, %release, ?errors, "conductor reported errors for request");
        }
        Ok(())
    }

    async fn login_key(&self, key_file: Option<&Path>) -> ConductorResult<String> {
        let path = match key_file {
            Some(path) => path.to_path_buf(),
            None => DEFAULT_KEY_FILES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_FILES[DEFAULT_KEY_FILES.len() - 1])),
        };
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConductorError::KeyFile { path, source })
    }
}

/// API root for `host`. A bare host name is reached over HTTPS.
fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/api/v1")
    } else {
        format!("https://{host}/api/v1")
    }
}

#[async_trait]
impl ConductorApi for RestConductor {
    async fn authenticate(&self) -> ConductorResult<()> {
        let key;
        let request = match &self.credentials {
            Credentials::Password { user, password } => LoginRequest {
                username: user,
                password: Some(password),
                local: None,
            },
            Credentials::LocalKey { user, key_file } => {
                key = self.login_key(key_file.as_deref()).await?;
                LoginRequest {
                    username: user,
                    password: None,
                    local: Some(&key),
                }
            }
        };

        let url = self.url("login");
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| ConductorError::Http {
                url: url.clone(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            let reason = response
                .json::<ErrorResponse>()
                .await
                .unwrap_or_default()
                .message;
            return Err(ConductorError::Unauthorized(reason));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|source| ConductorError::Http { url, source })?;
        if let Some(file) = &self.token_file {
            file.write(&login.token);
        }
        *self.token.lock().await = Some(login.token);
        info!(user = %self.credentials.user(), "authenticated with conductor");
        Ok(())
    }

    async fn list_routers(&self) -> ConductorResult<Vec<RouterName>> {
        let routers: Vec<RouterRecord> = self.get_json("router", &[]).await?;
        Ok(routers.into_iter().map(|r| r.name).collect())
    }

    async fn conductor_identity(&self) -> ConductorResult<RouterName> {
        Ok(self.system_info().await?.router)
    }

    async fn conductor_version(&self) -> ConductorResult<String> {
        Ok(self.system_info().await?.software_version)
    }

    async fn list_upgrade_versions(&self, use_cache: bool) -> ConductorResult<Vec<String>> {
        if use_cache
            && let Some(releases) = self.release_cache.as_ref().and_then(ReleaseCache::load)
        {
            return Ok(releases);
        }

        let records: Vec<VersionRecord> = self
            .get_json("upgrade/versions", &[("onlyUpgrades", "false")])
            .await?;
        let releases: Vec<String> = records
            .iter()
            .map(|r| wire::normalize_release(&r.version))
            .collect();

        if !releases.is_empty()
            && let Some(cache) = &self.release_cache
        {
            cache.store(&releases);
        }
        Ok(releases)
    }

    async fn fetch_assets(&self) -> ConductorResult<AssetSnapshot> {
        let mut cached = self.assets.lock().await;
        if let Some(entry) = cached.as_ref()
            && entry.fetched_at.elapsed() < self.asset_ttl
        {
            return Ok(entry.snapshot.clone());
        }

        let records: Vec<AssetRecord> = self.get_json("asset", &[("verbose", "true")]).await?;
        let assets: Vec<RouterAsset> = records.into_iter().map(AssetRecord::into_asset).collect();
        debug!(count = assets.len(), "asset list refreshed");

        let snapshot = AssetSnapshot::new(assets);
        *cached = Some(CachedAssets {
            fetched_at: Instant::now(),
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    async fn request_download(&self, router: &str, release: &str) -> ConductorResult<()> {
        self.mutate(wire::DOWNLOAD_MUTATION, router, release).await
    }

    async fn request_upgrade(&self, router: &str, release: &str) -> ConductorResult<()> {
        self.mutate(wire::UPGRADE_MUTATION, router, release).await
    }
}
