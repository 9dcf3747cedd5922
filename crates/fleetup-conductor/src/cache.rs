//! Best-effort local files: the release-list cache and the API token.
//!
//! Neither file is needed for correctness. Read failures fall back to
//! the conductor and write failures are only logged.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::debug;

/// Release list cache lifetime.
pub const RELEASE_CACHE_MAX_AGE: Duration = Duration::from_secs(86_400);

/// `~/.{app}.release_cache`
pub fn default_release_cache_path(app: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{app}.release_cache")))
}

/// `~/.{app}.api.token`
pub fn default_token_path(app: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{app}.api.token")))
}

/// On-disk JSON list of release strings, valid for `max_age` after its
/// last write.
#[derive(Debug, Clone)]
pub struct ReleaseCache {
    path: PathBuf,
    max_age: Duration,
}

impl ReleaseCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: RELEASE_CACHE_MAX_AGE,
        }
    }

    /// Cached releases, or `None` when the file is absent, stale, or corrupt.
    pub fn load(&self) -> Option<Vec<String>> {
        let modified = std::fs::metadata(&self.path).ok()?.modified().ok()?;
        if !is_fresh(modified, SystemTime::now(), self.max_age) {
            debug!(path = ?self.path, "release cache expired");
            return None;
        }
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(releases) => {
                debug!(path = ?self.path, count = releases.len(), "release list read from cache");
                Some(releases)
            }
            Err(e) => {
                debug!(path = ?self.path, error = %e, "release cache unreadable, ignoring");
                None
            }
        }
    }

    pub fn store(&self, releases: &[String]) {
        let result = serde_json::to_string(releases)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&self.path, json));
        if let Err(e) = result {
            debug!(path = ?self.path, error = %e, "could not write release cache");
        }
    }
}

/// A file modified at `modified` is fresh at `now` if younger than `max_age`.
/// Timestamps in the future count as fresh.
fn is_fresh(modified: SystemTime, now: SystemTime, max_age: Duration) -> bool {
    match now.duration_since(modified) {
        Ok(age) => age <= max_age,
        Err(_) => true,
    }
}

/// Bearer token persisted between runs.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read(&self) -> Option<String> {
        debug!(path = ?self.path, "reading API token");
        let token = std::fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn write(&self, token: &str) {
        if let Err(e) = std::fs::write(&self.path, token) {
            debug!(path = ?self.path, error = %e, "could not persist API token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ReleaseCache::new(dir.path().join("releases"));
        assert_eq!(cache.load(), None);

        let releases = vec!["5.4.0-1".to_string(), "5.5.2-1".to_string()];
        cache.store(&releases);
        assert_eq!(cache.load(), Some(releases));
    }

    #[test]
    fn corrupt_release_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releases");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(ReleaseCache::new(path).load(), None);
    }

    #[test]
    fn store_into_missing_directory_does_not_panic() {
        let cache = ReleaseCache::new("/nonexistent/dir/releases");
        cache.store(&["5.4.0".to_string()]);
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn freshness_window() {
        let now = SystemTime::now();
        let day = Duration::from_secs(86_400);
        assert!(is_fresh(now - Duration::from_secs(60), now, day));
        assert!(!is_fresh(now - Duration::from_secs(86_401), now, day));
        assert!(is_fresh(now + Duration::from_secs(60), now, day));
    }

    #[test]
    fn token_file_trims_and_ignores_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("token"));
        assert_eq!(file.read(), None);

        file.write("abc123\n");
        assert_eq!(file.read().as_deref(), Some("abc123"));

        file.write("");
        assert_eq!(file.read(), None);
    }
}
