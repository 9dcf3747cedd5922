//! fleetup-core: types shared by the conductor client, the status
//! tracker, and the rollout engine.

pub mod config;
pub mod release;
pub mod types;

pub use config::FleetupConfig;
pub use release::{MIN_RELEASE, ReleaseError, ReleaseVersion, unified_release};
pub use types::*;
