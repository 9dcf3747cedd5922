//! Effective settings: command-line flags over `fleetup.toml` over
//! built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use fleetup_conductor::cache::{default_release_cache_path, default_token_path};
use fleetup_conductor::{ConductorSettings, Credentials};
use fleetup_core::FleetupConfig;
use fleetup_rollout::{RolloutOptions, RouterFilter};

use crate::Cli;

/// Names the user agent and the files under `$HOME` and `/tmp`.
pub const APP: &str = "fleetup";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_USER: &str = "admin";
const DEFAULT_PARALLEL: usize = 1;
const DEFAULT_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Settings {
    pub conductor: ConductorSettings,
    pub rollout: RolloutOptions,
    pub filters: Vec<RouterFilter>,
    pub router_file: Option<PathBuf>,
    pub blacklist_file: Option<PathBuf>,
    pub status_file: Option<PathBuf>,
    pub refresh_releases: bool,
}

impl Settings {
    /// Merge flags and config. Filters are parsed here so a bad filter
    /// fails before anything talks to the conductor.
    pub fn resolve(cli: &Cli, config: &FleetupConfig) -> anyhow::Result<Self> {
        let file = &config.conductor;
        let user = cli
            .user
            .clone()
            .or_else(|| file.user.clone())
            .unwrap_or_else(|| DEFAULT_USER.to_string());
        let credentials = match cli.password.clone().or_else(|| file.password.clone()) {
            Some(password) => Credentials::Password { user, password },
            None => Credentials::LocalKey {
                user,
                key_file: cli.key_file.clone().or_else(|| file.key_file.clone()),
            },
        };

        let conductor = ConductorSettings {
            host: cli
                .host
                .clone()
                .or_else(|| file.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            credentials,
            verify_tls: file.verify_tls.unwrap_or(false),
            app: APP.to_string(),
            token_file: default_token_path(APP),
            release_cache: default_release_cache_path(APP),
        };

        let file = &config.rollout;
        let timeout = cli
            .timeout
            .or(file.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let download_timeout = cli
            .download_timeout
            .or(file.download_timeout)
            .unwrap_or(timeout);

        let rollout = RolloutOptions {
            parallelism: cli.parallel.or(file.parallel).unwrap_or(DEFAULT_PARALLEL),
            max_routers: cli.max.or(file.max),
            upgrade_timeout: Duration::from_secs(timeout),
            download_timeout: Duration::from_secs(download_timeout),
            dry_run: cli.dry_run,
            download_only: cli.download_only,
            wait_for_stable: cli.wait_for_stable,
            ignore_download_errors: cli.ignore_download_errors,
            ..RolloutOptions::new(cli.release.clone().unwrap_or_default())
        };

        let filters = cli
            .filters
            .iter()
            .map(|f| f.parse::<RouterFilter>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            conductor,
            rollout,
            filters,
            router_file: cli.router_file.clone().or_else(|| file.router_file.clone()),
            blacklist_file: cli
                .blacklist_file
                .clone()
                .or_else(|| file.blacklist_file.clone()),
            status_file: cli.status_file.clone().or_else(|| file.status_file.clone()),
            refresh_releases: cli.refresh_releases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["fleetup"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn config(toml_str: &str) -> FleetupConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn defaults_without_config() {
        let settings = Settings::resolve(&cli(&["-r", "5.5.2"]), &FleetupConfig::default()).unwrap();
        assert_eq!(settings.conductor.host, "localhost");
        assert!(matches!(
            settings.conductor.credentials,
            Credentials::LocalKey { ref user, key_file: None } if user == "admin"
        ));
        assert_eq!(settings.rollout.target, "5.5.2");
        assert_eq!(settings.rollout.parallelism, 1);
        assert_eq!(settings.rollout.upgrade_timeout, Duration::from_secs(3600));
        assert_eq!(settings.rollout.download_timeout, Duration::from_secs(3600));
        assert!(settings.filters.is_empty());
    }

    #[test]
    fn flags_override_config() {
        let config = config(
            r#"
[conductor]
host = "conductor.lab"
user = "ops"
password = "from-file"

[rollout]
parallel = 4
timeout = 600
status_file = "/var/tmp/fleetup.status"
"#,
        );
        let settings = Settings::resolve(
            &cli(&["-r", "5.5.2", "--host", "other.lab", "-p", "2"]),
            &config,
        )
        .unwrap();

        assert_eq!(settings.conductor.host, "other.lab");
        assert!(matches!(
            settings.conductor.credentials,
            Credentials::Password { ref user, ref password } if user == "ops" && password == "from-file"
        ));
        assert_eq!(settings.rollout.parallelism, 2);
        assert_eq!(settings.rollout.upgrade_timeout, Duration::from_secs(600));
        assert_eq!(settings.rollout.download_timeout, Duration::from_secs(600));
        assert_eq!(
            settings.status_file,
            Some(PathBuf::from("/var/tmp/fleetup.status"))
        );
    }

    #[test]
    fn download_timeout_can_differ() {
        let settings = Settings::resolve(
            &cli(&["-r", "5.5.2", "-t", "100", "--download-timeout", "900"]),
            &FleetupConfig::default(),
        )
        .unwrap();
        assert_eq!(settings.rollout.upgrade_timeout, Duration::from_secs(100));
        assert_eq!(settings.rollout.download_timeout, Duration::from_secs(900));
    }

    #[test]
    fn bad_filter_fails_early() {
        let err = Settings::resolve(
            &cli(&["-r", "5.5.2", "-f", "name.startswith"]),
            &FleetupConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected key=value"));

        assert!(
            Settings::resolve(
                &cli(&["-r", "5.5.2", "-f", "color=blue"]),
                &FleetupConfig::default()
            )
            .is_err()
        );
    }

    #[test]
    fn list_releases_has_no_target() {
        let settings =
            Settings::resolve(&cli(&["--list-releases"]), &FleetupConfig::default()).unwrap();
        assert!(settings.rollout.target.is_empty());
    }
}
