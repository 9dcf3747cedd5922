//! fleetup.toml configuration parser.
//!
//! Every field is optional; command-line flags override the file and
//! the file overrides the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "fleetup.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetupConfig {
    pub conductor: ConductorConfig,
    pub rollout: RolloutConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Private key used for local login when no password is set.
    pub key_file: Option<PathBuf>,
    pub verify_tls: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    pub parallel: Option<usize>,
    pub max: Option<usize>,
    /// Upgrade timeout in seconds.
    pub timeout: Option<u64>,
    /// Download timeout in seconds (defaults to `timeout`).
    pub download_timeout: Option<u64>,
    pub status_file: Option<PathBuf>,
    pub router_file: Option<PathBuf>,
    pub blacklist_file: Option<PathBuf>,
}

impl FleetupConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FleetupConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, else `./fleetup.toml` when it exists, else
    /// an empty config.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[conductor]
host = "conductor.lab"
user = "admin"
verify_tls = true

[rollout]
parallel = 4
timeout = 1800
status_file = "/var/tmp/fleetup.status"
"#;
        let config: FleetupConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.conductor.host.as_deref(), Some("conductor.lab"));
        assert_eq!(config.conductor.verify_tls, Some(true));
        assert_eq!(config.rollout.parallel, Some(4));
        assert_eq!(config.rollout.timeout, Some(1800));
        assert_eq!(config.rollout.download_timeout, None);
        assert_eq!(
            config.rollout.status_file.as_deref(),
            Some(Path::new("/var/tmp/fleetup.status"))
        );
    }

    #[test]
    fn test_parse_empty() {
        let config: FleetupConfig = toml::from_str("").unwrap();
        assert_eq!(config, FleetupConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(FleetupConfig::load(Some(Path::new("/nonexistent/fleetup.toml"))).is_err());
    }
}
