//! fleetup: staged software upgrades across the routers of a conductor.
//!
//! # Usage
//!
//! ```text
//! fleetup --list-releases
//! fleetup -r 5.5.2 -p 4 -m 20 -f name.startswith=branch- --status-file fleetup.status
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing::error;

use fleetup_conductor::{ConductorApi, RestConductor};
use fleetup_core::FleetupConfig;
use fleetup_rollout::ReleaseCatalog;

mod commands;
mod logging;
mod settings;

use settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "fleetup",
    about = "Upgrade routers managed by a conductor, chunk by chunk",
    version,
    group(ArgGroup::new("action").required(true).args(["release", "list_releases"])),
)]
struct Cli {
    /// Show the releases available for upgrade and exit
    #[arg(long)]
    list_releases: bool,

    /// Target release, e.g. 5.5.2 or 5.5.2-1.el7
    #[arg(short = 'r', long)]
    release: Option<String>,

    /// Conductor host, or an http(s):// base URL [default: localhost]
    #[arg(long)]
    host: Option<String>,

    /// Conductor user [default: admin]
    #[arg(long)]
    user: Option<String>,

    /// Password; without one, the local key file is used to log in
    #[arg(long)]
    password: Option<String>,

    /// Private key for local login
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Routers per chunk, 0 for all at once [default: 1]
    #[arg(short = 'p', long)]
    parallel: Option<usize>,

    /// Upgrade at most this many routers
    #[arg(short = 'm', long)]
    max: Option<usize>,

    /// Upgrade timeout per chunk in seconds [default: 3600]
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Download timeout per chunk in seconds [default: --timeout]
    #[arg(long)]
    download_timeout: Option<u64>,

    /// Router filter as key=value, applied in order (repeatable)
    #[arg(short = 'f', long = "filter", value_name = "KEY=VALUE")]
    filters: Vec<String>,

    /// File with the routers to upgrade, one per line
    #[arg(long)]
    router_file: Option<PathBuf>,

    /// File with routers that must not be upgraded, one per line
    #[arg(long)]
    blacklist_file: Option<PathBuf>,

    /// Only report what would be done
    #[arg(long)]
    dry_run: bool,

    /// Download the release but do not upgrade
    #[arg(short = 'd', long)]
    download_only: bool,

    /// Consider a router upgraded only once all nodes are stable
    #[arg(long)]
    wait_for_stable: bool,

    /// Skip routers that cannot download the release in time
    #[arg(long)]
    ignore_download_errors: bool,

    /// Verbose output, also written to /tmp/fleetup/
    #[arg(long)]
    debug: bool,

    /// Keep the per-router rollout status in this file
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Ignore the cached release list
    #[arg(long)]
    refresh_releases: bool,

    /// Config file [default: ./fleetup.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.debug);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = FleetupConfig::load(cli.config.as_deref()).context("failed to load config")?;
    let settings = Settings::resolve(&cli, &config)?;

    let conductor = RestConductor::new(settings.conductor.clone())?;
    if !conductor.has_token().await {
        conductor.authenticate().await?;
    }
    commands::log_conductor(&conductor).await?;

    let catalog = ReleaseCatalog::fetch(&conductor, !settings.refresh_releases).await?;
    if cli.list_releases {
        commands::list::run(&catalog);
        return Ok(());
    }

    commands::apply::run(&conductor, &settings, &catalog).await
}
