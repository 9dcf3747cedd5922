pub mod apply;
pub mod list;

use tracing::info;

use fleetup_conductor::ConductorApi;

/// Log which conductor we are talking to.
pub async fn log_conductor(api: &dyn ConductorApi) -> anyhow::Result<()> {
    let version = api.conductor_version().await?;
    let identity = api.conductor_identity().await?;
    info!(conductor = %identity, %version, "connected to conductor");
    Ok(())
}
